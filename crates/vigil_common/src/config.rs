//! Vigil configuration.
//!
//! Lives in `$VIGIL_CONFIG` or `<config_dir>/vigil/config.toml`.
//! Every field has a default, so an empty or missing file is valid.

use crate::reconcile::ConflictPolicy;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use vigil_shared::ActivityCatalog;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "VIGIL_CONFIG";
const CONFIG_FILE: &str = "config.toml";

/// Default vigild address
pub const DEFAULT_BIND: &str = "127.0.0.1:7866";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Remote progression service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout (seconds, valid: 1-120)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    format!("http://{}", DEFAULT_BIND)
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(1, 120)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.effective_timeout_secs())
    }
}

/// Storage retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per storage call (valid: 1-10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay (ms, valid: 0-10000)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (ms, valid: initial-60000)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.clamp(1, 10)
    }

    pub fn effective_initial_backoff_ms(&self) -> u64 {
        self.initial_backoff_ms.min(10_000)
    }

    pub fn effective_max_backoff_ms(&self) -> u64 {
        self.max_backoff_ms
            .clamp(self.effective_initial_backoff_ms(), 60_000)
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.effective_max_attempts(),
            initial_backoff: Duration::from_millis(self.effective_initial_backoff_ms()),
            max_backoff: Duration::from_millis(self.effective_max_backoff_ms()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

/// Activity ids accepted in completion events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<String>,

    #[serde(default = "default_games")]
    pub games: Vec<String>,
}

fn default_scenarios() -> Vec<String> {
    ActivityCatalog::builtin().scenarios.into_iter().collect()
}

fn default_games() -> Vec<String> {
    ActivityCatalog::builtin().games.into_iter().collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            scenarios: default_scenarios(),
            games: default_games(),
        }
    }
}

impl CatalogConfig {
    pub fn catalog(&self) -> ActivityCatalog {
        ActivityCatalog::new(self.scenarios.iter().cloned(), self.games.iter().cloned())
    }
}

/// vigild settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Where account records are kept (default `<data_dir>/accounts`)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            remote: RemoteConfig::default(),
            retry: RetryConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// `<data_dir>/vigil`, or `./.vigil` when the platform has no data dir
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("vigil"))
        .unwrap_or_else(|| PathBuf::from(".vigil"))
}

/// Config file location: `$VIGIL_CONFIG`, else `<config_dir>/vigil/config.toml`
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vigil")
        .join(CONFIG_FILE)
}

impl VigilConfig {
    /// Strict load: a missing file is an IO error, a malformed one a parse error
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from the standard location, falling back to defaults
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path())
    }

    /// Local guest record
    pub fn guest_dir(&self) -> PathBuf {
        self.data_dir.join("guest")
    }

    /// Account records the remote store has not accepted yet
    pub fn pending_dir(&self) -> PathBuf {
        self.data_dir.join("pending")
    }

    /// Persisted CLI session identity
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn server_data_dir(&self) -> PathBuf {
        self.server
            .data_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("accounts"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }
}
