//! File-backed progression store.
//!
//! One pretty-printed JSON file per identity. Writes go to a temp file
//! that is renamed over the record, so a crash leaves either the old or
//! the new record on disk, never a torn one.

use crate::backend::{record_key, ProgressBackend};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use vigil_shared::{Identity, ProgressionError, Result, UserId, UserProgress};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.json", record_key(identity)))
    }

    /// Account ids with a record in this store, sorted. Files that do not
    /// decode to a valid id are skipped.
    pub fn user_ids(&self) -> Result<Vec<UserId>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(encoded) = name
                .to_str()
                .and_then(|n| n.strip_prefix("user-"))
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            let decoded = hex::decode(encoded)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .and_then(|id| UserId::new(id).ok());
            match decoded {
                Some(id) => ids.push(id),
                None => debug!("Skipping unrecognized record file {:?}", name),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl ProgressBackend for FileStore {
    fn load(&self, identity: &Identity) -> Result<UserProgress> {
        let path = self.path_for(identity);
        if !path.exists() {
            return Err(ProgressionError::NotFound(identity.clone()));
        }

        let content = fs::read_to_string(&path)?;
        let progress: UserProgress = serde_json::from_str(&content)?;
        debug!("Loaded {} from {}", identity, path.display());
        Ok(progress.normalized())
    }

    fn save(&self, identity: &Identity, progress: &UserProgress) -> Result<()> {
        let content = serde_json::to_string_pretty(progress)?;
        write_atomic(&self.path_for(identity), content.as_bytes())?;
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<()> {
        let path = self.path_for(identity);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file store at {}", self.dir.display())
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_record_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = store.load(&Identity::Guest).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        let mut progress = UserProgress::default();
        progress.xp = 240;
        progress.completed_scenarios.insert("usb-drop".to_string());
        let progress = progress.normalized();

        store.save(&Identity::Guest, &progress).unwrap();
        let loaded = store.load(&Identity::Guest).unwrap();
        assert_eq!(loaded, progress);
        assert_eq!(loaded.level(), 3);
        assert!(!store.path_for(&Identity::Guest).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_identities_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let ada = Identity::User(UserId::new("ada").unwrap());

        let mut progress = UserProgress::default();
        progress.xp = 10;
        store.save(&ada, &progress.normalized()).unwrap();

        assert!(store.load(&Identity::Guest).unwrap_err().is_not_found());
        assert_eq!(store.load(&ada).unwrap().xp, 10);
    }

    #[test]
    fn test_overwrite_is_whole_record() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut first = UserProgress::default();
        first.games_played = 7;
        store.save(&Identity::Guest, &first).unwrap();
        store.save(&Identity::Guest, &UserProgress::default()).unwrap();

        assert_eq!(store.load(&Identity::Guest).unwrap().games_played, 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&Identity::Guest, &UserProgress::default()).unwrap();
        store.remove(&Identity::Guest).unwrap();
        store.remove(&Identity::Guest).unwrap();
        assert!(store.load(&Identity::Guest).unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_record_is_an_error_not_a_default() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path_for(&Identity::Guest), "{ not json").unwrap();
        let err = store.load(&Identity::Guest).unwrap_err();
        assert!(matches!(err, ProgressionError::Json(_)));
    }

    #[test]
    fn test_user_ids_lists_accounts_only() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.user_ids().unwrap().is_empty());

        for name in ["bob", "ada lovelace"] {
            let id = Identity::User(UserId::new(name).unwrap());
            store.save(&id, &UserProgress::default()).unwrap();
        }
        store.save(&Identity::Guest, &UserProgress::default()).unwrap();
        fs::write(dir.path().join("user-zz.json"), "{}").unwrap();

        let ids = store.user_ids().unwrap();
        let names: Vec<_> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["ada lovelace", "bob"]);
    }
}
