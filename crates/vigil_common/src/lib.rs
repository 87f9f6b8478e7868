//! Persistence, configuration and reconciliation for Vigil.
//!
//! Builds on the pure engine in `vigil-shared`: backends that load and
//! save whole `UserProgress` records, the per-identity `ProgressionStore`,
//! and the `ReconciliationService` that decides which store is
//! authoritative for the current session.

pub mod backend;
pub mod config;
pub mod file_store;
pub mod http_store;
pub mod memory_store;
pub mod pending;
pub mod reconcile;
pub mod retry;
pub mod store;

pub use backend::{record_key, ProgressBackend};
pub use config::{ConfigError, VigilConfig};
pub use file_store::FileStore;
pub use http_store::HttpStore;
pub use memory_store::MemoryStore;
pub use pending::{CachedRecord, PendingCache};
pub use reconcile::{
    Authority, ConflictPolicy, LoadedProgress, Recorded, ReconciliationService, SignInOutcome,
    SyncState,
};
pub use retry::RetryPolicy;
pub use store::{ProgressionStore, ResetConfirmation};

pub use vigil_shared::{
    ActivityCatalog, ActivityKind, BadgeId, CompletionEvent, CompletionOutcome, Identity,
    ProgressionError, Result, UserId, UserProgress,
};
