//! Persisted CLI session.
//!
//! Remembers who is signed in between invocations. A missing file means
//! guest mode.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vigil_common::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    pub identity: Identity,
    pub updated_at: DateTime<Utc>,
}

impl SessionFile {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            updated_at: Utc::now(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(Identity::Guest));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Session file {} is corrupt; delete it to sign out", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write session {}", path.display()))
    }
}
