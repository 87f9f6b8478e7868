//! Storage boundary for progression records.

use std::sync::Arc;
use vigil_shared::{Identity, Result, UserProgress};

/// Whole-record key-value persistence keyed by identity.
///
/// Writes always carry the complete record, never a delta, so repeating a
/// save is harmless.
pub trait ProgressBackend: Send + Sync {
    /// Fetch the record for `identity`.
    ///
    /// A missing record is `ProgressionError::NotFound`, distinct from any
    /// transport or storage failure.
    fn load(&self, identity: &Identity) -> Result<UserProgress>;

    /// Replace the record for `identity`.
    fn save(&self, identity: &Identity, progress: &UserProgress) -> Result<()>;

    /// Delete the record; deleting a missing record succeeds.
    fn remove(&self, identity: &Identity) -> Result<()>;

    /// Short label for logs
    fn describe(&self) -> String;
}

impl<T: ProgressBackend + ?Sized> ProgressBackend for Arc<T> {
    fn load(&self, identity: &Identity) -> Result<UserProgress> {
        (**self).load(identity)
    }

    fn save(&self, identity: &Identity, progress: &UserProgress) -> Result<()> {
        (**self).save(identity, progress)
    }

    fn remove(&self, identity: &Identity) -> Result<()> {
        (**self).remove(identity)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Filesystem-safe key for an identity
pub fn record_key(identity: &Identity) -> String {
    match identity {
        Identity::Guest => vigil_shared::GUEST_TAG.to_string(),
        Identity::User(id) => format!("user-{}", hex::encode(id.as_str())),
    }
}
