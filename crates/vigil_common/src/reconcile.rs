//! Guest/account reconciliation.
//!
//! The one place that decides which store is authoritative:
//!
//! - guest session: the local guest record
//! - authenticated session: the remote record for that user id
//!
//! On sign-in an existing account record always wins over guest progress
//! (no merging, so XP and badges cannot be counted twice). With no account
//! record, the guest record seeds it once and is then cleared locally. An
//! unsynced record parked for the account counts as an account record.
//!
//! Remote failures while authenticated never credit the guest record.
//! On a transient failure the fresh record goes to the pending cache under
//! the user's id and the caller is told it is `CachedLocally`. Permanent
//! rejections are returned as errors.
//!
//! Concurrent writers for the same user resolve as last full-record write
//! wins; badge sets from two devices are not unioned.

use crate::backend::ProgressBackend;
use crate::config::VigilConfig;
use crate::file_store::FileStore;
use crate::http_store::HttpStore;
use crate::pending::{CachedRecord, PendingCache};
use crate::retry::RetryPolicy;
use crate::store::{ProgressionStore, ResetConfirmation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use vigil_shared::{
    export_progress, import_progress, ActivityCatalog, CompletionEvent, CompletionOutcome,
    Identity, ProgressionError, Result, UserId, UserProgress,
};

/// What to do when both a guest and an account record exist at sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep the account record, offer the guest record for export
    #[default]
    RemoteWins,
    /// Refuse the sign-in and stay in guest mode
    Reject,
}

/// Store that currently owns the live record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    GuestLocal,
    Remote(UserId),
}

/// Where the latest record ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Written to the authoritative store
    Synced,
    /// Remote store unavailable; held in the pending cache until synced
    CachedLocally,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProgress {
    pub progress: UserProgress,
    pub sync: SyncState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub outcome: CompletionOutcome,
    pub sync: SyncState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Account record existed and was kept. A non-trivial guest record is
    /// returned untouched for export or inspection.
    RemoteKept {
        progress: UserProgress,
        guest_snapshot: Option<UserProgress>,
    },
    /// No account record; the guest record became the account record
    SeededFromGuest(UserProgress),
    /// Neither record existed
    Fresh(UserProgress),
}

impl SignInOutcome {
    pub fn progress(&self) -> &UserProgress {
        match self {
            SignInOutcome::RemoteKept { progress, .. } => progress,
            SignInOutcome::SeededFromGuest(progress) => progress,
            SignInOutcome::Fresh(progress) => progress,
        }
    }
}

pub struct ReconciliationService {
    session: Identity,
    guest: Arc<dyn ProgressBackend>,
    remote: Arc<dyn ProgressBackend>,
    pending: PendingCache,
    catalog: Arc<ActivityCatalog>,
    retry: RetryPolicy,
    policy: ConflictPolicy,
}

impl ReconciliationService {
    /// Start in guest mode
    pub fn new(
        guest: Arc<dyn ProgressBackend>,
        remote: Arc<dyn ProgressBackend>,
        pending: PendingCache,
        catalog: ActivityCatalog,
    ) -> Self {
        Self {
            session: Identity::Guest,
            guest,
            remote,
            pending,
            catalog: Arc::new(catalog),
            retry: RetryPolicy::default(),
            policy: ConflictPolicy::default(),
        }
    }

    /// Wire up the file guest store, the HTTP remote store and the pending
    /// cache from configuration.
    pub fn from_config(config: &VigilConfig) -> Result<Self> {
        let remote = HttpStore::new(&config.remote.endpoint, config.remote.timeout())?;
        Ok(Self::new(
            Arc::new(FileStore::new(config.guest_dir())),
            Arc::new(remote),
            PendingCache::new(config.pending_dir()),
            config.catalog.catalog(),
        )
        .with_retry(config.retry.policy())
        .with_policy(config.reconciliation.conflict_policy))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resume a session restored by the caller (no reconciliation runs)
    pub fn with_session(mut self, session: Identity) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Identity {
        &self.session
    }

    pub fn authority(&self) -> Authority {
        match &self.session {
            Identity::Guest => Authority::GuestLocal,
            Identity::User(id) => Authority::Remote(id.clone()),
        }
    }

    /// Store for the authoritative backend of the current session
    pub fn store(&self) -> ProgressionStore {
        self.store_for(self.session.clone())
    }

    fn store_for(&self, identity: Identity) -> ProgressionStore {
        let backend = match identity {
            Identity::Guest => self.guest.clone(),
            Identity::User(_) => self.remote.clone(),
        };
        ProgressionStore::new(identity, backend, self.catalog.clone(), self.retry)
    }

    /// Live record for the current session.
    ///
    /// For an authenticated user an unsynced cached record is pushed first;
    /// if the remote store is still unavailable that record is returned
    /// marked `CachedLocally`.
    pub fn load(&self) -> Result<LoadedProgress> {
        if let Identity::User(id) = &self.session {
            if let Some(cached) = self.pending.get(id)? {
                return match self.push_cached(&cached) {
                    Ok(()) => Ok(LoadedProgress {
                        progress: cached.progress,
                        sync: SyncState::Synced,
                    }),
                    Err(e) => {
                        warn!(
                            "Remote store still unavailable for '{}' ({}); using record cached at {}",
                            id, e, cached.cached_at
                        );
                        Ok(LoadedProgress {
                            progress: cached.progress,
                            sync: SyncState::CachedLocally,
                        })
                    }
                };
            }
        }

        Ok(LoadedProgress {
            progress: self.store().load()?,
            sync: SyncState::Synced,
        })
    }

    /// Score `event` against the caller's live record and persist the result.
    ///
    /// An invalid event is rejected before anything changes. Once the event
    /// is valid, `live` is replaced by the new record before persisting, so
    /// it stays current even when the save fails and an error is returned.
    pub fn record_completion(
        &self,
        live: &mut UserProgress,
        event: &CompletionEvent,
    ) -> Result<Recorded> {
        let outcome = self.store().apply_completion(live, event)?;
        *live = outcome.progress.clone();

        for badge in &outcome.unlocked {
            info!("{} unlocked badge '{}'", self.session, badge);
        }

        let sync = self.persist(live)?;
        Ok(Recorded { outcome, sync })
    }

    /// Write a whole record to the authoritative store.
    pub fn persist(&self, progress: &UserProgress) -> Result<SyncState> {
        let store = self.store();
        let err = match store.save(progress) {
            Ok(()) => {
                if let Identity::User(id) = &self.session {
                    // A newer record just landed remotely; an older parked one must not replay
                    if let Err(e) = self.pending.clear(id) {
                        warn!("Could not clear pending record for '{}': {}", id, e);
                    }
                }
                return Ok(SyncState::Synced);
            }
            Err(e) => e,
        };

        let id = match &self.session {
            Identity::User(id) if err.is_retryable() => id,
            // Guest failures and permanent rejections would never sync later
            _ => return Err(err),
        };

        warn!("Remote save for '{}' failed: {}; caching locally as unsynced", id, err);
        match self.pending.put(id, progress, &err.to_string()) {
            Ok(_) => Ok(SyncState::CachedLocally),
            Err(cache_err) => {
                error!("Pending cache write for '{}' failed: {}", id, cache_err);
                Err(ProgressionError::Persistence(format!(
                    "remote save failed ({}) and local cache failed ({})",
                    err, cache_err
                )))
            }
        }
    }

    /// Guest to account transition.
    pub fn sign_in(&mut self, user_id: UserId) -> Result<SignInOutcome> {
        let account = Identity::User(user_id.clone());
        let guest = if self.session.is_guest() {
            self.guest_snapshot()?
        } else {
            None
        };

        // An unsynced parked record is the newest copy of the account and
        // counts as existing account progress
        let remote = match self.pending.get(&user_id)? {
            Some(cached) => {
                info!(
                    "Account '{}' has an unsynced record cached at {}",
                    user_id, cached.cached_at
                );
                Some(cached.progress)
            }
            None => match self.retry.run("load account progress", || self.remote.load(&account)) {
                Ok(progress) => Some(progress.normalized()),
                Err(ProgressionError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
        };

        let outcome = match (remote, guest) {
            (Some(remote), Some(guest)) => {
                if self.policy == ConflictPolicy::Reject {
                    warn!(
                        "Sign-in for '{}' refused: guest and account progress both exist",
                        user_id
                    );
                    return Err(ProgressionError::ReconciliationConflict {
                        user_id: user_id.to_string(),
                        guest_xp: guest.xp,
                        remote_xp: remote.xp,
                    });
                }
                warn!(
                    "Keeping account progress for '{}' ({} XP); guest progress ({} XP) was not merged",
                    user_id, remote.xp, guest.xp
                );
                SignInOutcome::RemoteKept {
                    progress: remote,
                    guest_snapshot: Some(guest),
                }
            }
            (Some(remote), None) => SignInOutcome::RemoteKept {
                progress: remote,
                guest_snapshot: None,
            },
            (None, Some(guest)) => {
                self.store_for(account.clone()).save(&guest)?;
                if let Err(e) = self.guest.remove(&Identity::Guest) {
                    warn!("Account seeded but guest record could not be cleared: {}", e);
                }
                info!("Seeded account '{}' from guest progress ({} XP)", user_id, guest.xp);
                SignInOutcome::SeededFromGuest(guest)
            }
            (None, None) => SignInOutcome::Fresh(UserProgress::default()),
        };

        info!("Signed in as '{}'", user_id);
        self.session = account;
        Ok(outcome)
    }

    /// Back to guest mode; the account record stays where it is
    pub fn sign_out(&mut self) {
        if let Identity::User(id) = &self.session {
            info!("Signed out '{}'", id);
        }
        self.session = Identity::Guest;
    }

    /// Non-trivial local guest record, if any
    pub fn guest_snapshot(&self) -> Result<Option<UserProgress>> {
        match self.guest.load(&Identity::Guest) {
            Ok(progress) => {
                let progress = progress.normalized();
                Ok((!progress.is_pristine()).then_some(progress))
            }
            Err(ProgressionError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Unsynced record parked for the current user, if any
    pub fn pending_record(&self) -> Result<Option<CachedRecord>> {
        match &self.session {
            Identity::Guest => Ok(None),
            Identity::User(id) => self.pending.get(id),
        }
    }

    /// Push a parked record to the remote store. Returns what was pushed.
    pub fn flush_pending(&self) -> Result<Option<UserProgress>> {
        let Some(cached) = self.pending_record()? else {
            return Ok(None);
        };
        self.push_cached(&cached)?;
        Ok(Some(cached.progress))
    }

    fn push_cached(&self, cached: &CachedRecord) -> Result<()> {
        self.store_for(Identity::User(cached.user_id.clone()))
            .save(&cached.progress)?;
        self.pending.clear(&cached.user_id)?;
        info!(
            "Synced record for '{}' cached at {}",
            cached.user_id, cached.cached_at
        );
        Ok(())
    }

    /// Reset the current session's record to defaults
    pub fn reset(&self, confirmation: ResetConfirmation) -> Result<UserProgress> {
        let fresh = self.store().reset(confirmation)?;
        if let Identity::User(id) = &self.session {
            self.pending.clear(id)?;
        }
        Ok(fresh)
    }

    /// Export the live record as a JSON document
    pub fn export(&self, at: DateTime<Utc>) -> Result<String> {
        export_progress(&self.load()?.progress, at)
    }

    /// Replace the live record with an exported document
    pub fn import(&self, json: &str) -> Result<(UserProgress, SyncState)> {
        let progress = import_progress(json)?;
        let sync = self.persist(&progress)?;
        info!("Imported progress for {} ({} XP)", self.session, progress.xp);
        Ok((progress, sync))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use tempfile::tempdir;

    #[test]
    fn test_authority_follows_session() {
        let dir = tempdir().unwrap();
        let mut service = ReconciliationService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            PendingCache::new(dir.path()),
            ActivityCatalog::builtin(),
        );
        assert_eq!(service.authority(), Authority::GuestLocal);

        let ada = UserId::new("ada").unwrap();
        service.sign_in(ada.clone()).unwrap();
        assert_eq!(service.authority(), Authority::Remote(ada));

        service.sign_out();
        assert_eq!(service.authority(), Authority::GuestLocal);
    }

    #[test]
    fn test_conflict_policy_wire_names() {
        let json = serde_json::to_string(&ConflictPolicy::RemoteWins).unwrap();
        assert_eq!(json, "\"remote-wins\"");
        let policy: ConflictPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, ConflictPolicy::Reject);
    }
}
