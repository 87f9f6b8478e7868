//! Per-identity progression store.
//!
//! Wraps one backend for one identity. Numeric updates are delegated to the
//! pure completion pipeline; this type only adds I/O around it: loading
//! (with defaults for first-time identities), whole-record saves with
//! retry, and deliberate resets.

use crate::backend::ProgressBackend;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vigil_shared::{
    apply_completion, ActivityCatalog, CompletionEvent, CompletionOutcome, Identity,
    ProgressionError, Result, UserProgress,
};

/// Proof that the player asked for a reset.
///
/// Resets are never a side effect of another call; the caller has to build
/// this value on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetConfirmation {
    _confirmed: (),
}

impl ResetConfirmation {
    pub fn user_confirmed() -> Self {
        Self { _confirmed: () }
    }

    /// `Some` only when the confirmation flag was set
    pub fn from_flag(confirmed: bool) -> Option<Self> {
        confirmed.then(Self::user_confirmed)
    }
}

pub struct ProgressionStore {
    identity: Identity,
    backend: Arc<dyn ProgressBackend>,
    catalog: Arc<ActivityCatalog>,
    retry: RetryPolicy,
}

impl ProgressionStore {
    pub fn new(
        identity: Identity,
        backend: Arc<dyn ProgressBackend>,
        catalog: Arc<ActivityCatalog>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            identity,
            backend,
            catalog,
            retry,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current record, or defaults for an identity with no record yet.
    ///
    /// Storage failures are returned, never replaced by defaults.
    pub fn load(&self) -> Result<UserProgress> {
        let result = self
            .retry
            .run("load progress", || self.backend.load(&self.identity));
        match result {
            Ok(progress) => Ok(progress.normalized()),
            Err(ProgressionError::NotFound(_)) => {
                debug!("No record for {} yet, starting fresh", self.identity);
                Ok(UserProgress::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Pure transform: score `event` against `current` and return the new
    /// record. Nothing is persisted.
    pub fn apply_completion(
        &self,
        current: &UserProgress,
        event: &CompletionEvent,
    ) -> Result<CompletionOutcome> {
        self.apply_completion_at(current, event, Utc::now())
    }

    pub fn apply_completion_at(
        &self,
        current: &UserProgress,
        event: &CompletionEvent,
        at: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        apply_completion(current, event, &self.catalog, at)
    }

    /// Persist the whole record. Safe to repeat.
    pub fn save(&self, progress: &UserProgress) -> Result<()> {
        self.retry.run("save progress", || {
            self.backend.save(&self.identity, progress)
        })?;
        info!(
            "Saved progress for {} to {} (xp {}, level {})",
            self.identity,
            self.backend.describe(),
            progress.xp,
            progress.level()
        );
        Ok(())
    }

    /// Reinstate and persist defaults.
    pub fn reset(&self, _confirmation: ResetConfirmation) -> Result<UserProgress> {
        let fresh = UserProgress::default();
        self.save(&fresh)?;
        warn!("Progress for {} was reset", self.identity);
        Ok(fresh)
    }
}
