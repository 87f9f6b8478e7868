//! Player progression record and identities.
//!
//! One `UserProgress` exists per identity: either the guest tag (stored on
//! the local machine) or an authenticated user id (stored by the remote
//! service). Field names on the wire are camelCase and form a stable
//! schema shared by storage, the remote API and exported documents.

use crate::badges::BadgeId;
use crate::error::{ProgressionError, Result};
use crate::levels::{level_for_xp, LevelInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Storage key used for the unauthenticated player
pub const GUEST_TAG: &str = "guest";

/// Vigilance assigned to a fresh record
pub const DEFAULT_VIGILANCE: u8 = 50;

const MAX_USER_ID_LEN: usize = 128;

/// Authenticated user id as resolved by the session layer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ProgressionError::InvalidIdentity("empty user id".to_string()));
        }
        if trimmed.len() > MAX_USER_ID_LEN {
            return Err(ProgressionError::InvalidIdentity(format!(
                "user id longer than {} bytes",
                MAX_USER_ID_LEN
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ProgressionError::InvalidIdentity(
                "user id contains control characters".to_string(),
            ));
        }
        if trimmed == GUEST_TAG {
            return Err(ProgressionError::InvalidIdentity(format!(
                "'{}' is reserved for guest progression",
                GUEST_TAG
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ProgressionError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whose progression a record belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Guest,
    User(UserId),
}

impl Identity {
    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Identity::Guest => None,
            Identity::User(id) => Some(id),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Guest => write!(f, "{}", GUEST_TAG),
            Identity::User(id) => write!(f, "user '{}'", id),
        }
    }
}

/// Persistent progression state for one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Derived from `xp`; recomputed on every transform and on load
    level: u64,
    pub xp: u64,
    /// Smoothed skill estimate, always within 0-100
    pub vigilance_score: u8,
    #[serde(default)]
    pub completed_scenarios: BTreeSet<String>,
    #[serde(default)]
    pub badges: BTreeSet<BadgeId>,
    #[serde(default)]
    pub games_played: u64,
    /// Activities in a row scored at or above the streak threshold
    #[serde(default)]
    pub consecutive_correct: u32,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            vigilance_score: DEFAULT_VIGILANCE,
            completed_scenarios: BTreeSet::new(),
            badges: BTreeSet::from([BadgeId::Starter]),
            games_played: 0,
            consecutive_correct: 0,
            last_played: None,
        }
    }
}

impl UserProgress {
    pub fn level(&self) -> u64 {
        self.level
    }

    pub fn level_info(&self) -> LevelInfo {
        level_for_xp(self.xp)
    }

    /// Re-establish the derived invariants of a record that came from
    /// outside the engine (storage, remote service, import).
    pub fn normalized(mut self) -> Self {
        self.recompute_level();
        self.vigilance_score = self.vigilance_score.min(100);
        self.badges.insert(BadgeId::Starter);
        self
    }

    pub(crate) fn recompute_level(&mut self) {
        self.level = level_for_xp(self.xp).level;
    }

    /// True when nothing has been earned yet.
    pub fn is_pristine(&self) -> bool {
        self.xp == 0
            && self.vigilance_score == DEFAULT_VIGILANCE
            && self.completed_scenarios.is_empty()
            && self.games_played == 0
            && self.consecutive_correct == 0
            && self.badges.iter().all(|b| *b == BadgeId::Starter)
    }

    pub fn has_badge(&self, badge: BadgeId) -> bool {
        self.badges.contains(&badge)
    }
}
