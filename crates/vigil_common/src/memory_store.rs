//! In-process progression store.

use crate::backend::ProgressBackend;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use vigil_shared::{Identity, ProgressionError, Result, UserProgress};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Identity, UserProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, identity: Identity, progress: UserProgress) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.insert(identity, progress);
        }
        self
    }

    /// Current record without going through the backend contract
    pub fn get(&self, identity: &Identity) -> Option<UserProgress> {
        self.records.lock().ok()?.get(identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<Identity, UserProgress>>> {
        self.records
            .lock()
            .map_err(|_| ProgressionError::Persistence("memory store lock poisoned".to_string()))
    }
}

impl ProgressBackend for MemoryStore {
    fn load(&self, identity: &Identity) -> Result<UserProgress> {
        self.records()?
            .get(identity)
            .cloned()
            .ok_or_else(|| ProgressionError::NotFound(identity.clone()))
    }

    fn save(&self, identity: &Identity, progress: &UserProgress) -> Result<()> {
        self.records()?.insert(identity.clone(), progress.clone());
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<()> {
        self.records()?.remove(identity);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory store".to_string()
    }
}
