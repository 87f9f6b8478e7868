//! Local cache for account records the remote store did not accept.
//!
//! When a save for an authenticated user fails, the record is parked here
//! under that user's id, never under the guest tag, together with the
//! reason. Its presence is the "unsynced" marker: the record is pushed to
//! the remote store on the next successful contact and then removed.

use crate::backend::record_key;
use crate::file_store::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vigil_shared::{Identity, Result, UserId, UserProgress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord {
    pub user_id: UserId,
    pub progress: UserProgress,
    pub cached_at: DateTime<Utc>,
    /// Why the remote save failed
    pub reason: String,
}

pub struct PendingCache {
    dir: PathBuf,
}

impl PendingCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, user_id: &UserId) -> PathBuf {
        let key = record_key(&Identity::User(user_id.clone()));
        self.dir.join(format!("{}.json", key))
    }

    /// Park a record as unsynced, replacing any older one
    pub fn put(&self, user_id: &UserId, progress: &UserProgress, reason: &str) -> Result<CachedRecord> {
        let record = CachedRecord {
            user_id: user_id.clone(),
            progress: progress.clone(),
            cached_at: Utc::now(),
            reason: reason.to_string(),
        };
        let content = serde_json::to_string_pretty(&record)?;
        write_atomic(&self.path_for(user_id), content.as_bytes())?;
        Ok(record)
    }

    pub fn get(&self, user_id: &UserId) -> Result<Option<CachedRecord>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let mut record: CachedRecord = serde_json::from_str(&content)?;
        record.progress = record.progress.normalized();
        Ok(Some(record))
    }

    pub fn clear(&self, user_id: &UserId) -> Result<()> {
        let path = self.path_for(user_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
