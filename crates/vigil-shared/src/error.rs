//! Error types for Vigil.

use crate::progress::Identity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("No progression record for {0}")]
    NotFound(Identity),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid completion event: {0}")]
    InvalidEvent(String),

    #[error(
        "Reconciliation conflict for '{user_id}': guest record ({guest_xp} XP) and account record ({remote_xp} XP) both exist"
    )]
    ReconciliationConflict {
        user_id: String,
        guest_xp: u64,
        remote_xp: u64,
    },

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// The store refused the record; repeating the request will not help
    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProgressionError {
    pub fn code(&self) -> i32 {
        match self {
            ProgressionError::NotFound(_) => -32010,
            ProgressionError::Persistence(_) => -32011,
            ProgressionError::InvalidEvent(_) => -32012,
            ProgressionError::ReconciliationConflict { .. } => -32013,
            ProgressionError::InvalidIdentity(_) => -32014,
            ProgressionError::Rejected(_) => -32015,
            ProgressionError::Io(_) => -32006,
            ProgressionError::Json(_) => -32700,
        }
    }

    /// Transient storage failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProgressionError::Persistence(_) | ProgressionError::Io(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProgressionError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
