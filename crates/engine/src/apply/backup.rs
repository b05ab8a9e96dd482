//! Content-addressed backup snapshots
//!
//! One record per file per session, created lazily before the first mutation
//! and never deleted silently. The store is the sole reader and writer of
//! backup locations; layout is `root/<session-timestamp>/<sha256-of-path>`,
//! a content-identical copy that stays recoverable by hand even if the tool
//! crashes mid-session.

use crate::core::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub file_path: PathBuf,

    pub original_content_hash: String,

    pub backup_location: PathBuf,

    pub created_at: DateTime<Utc>,
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub struct BackupStore {
    session_dir: PathBuf,
    records: HashMap<PathBuf, BackupRecord>,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let session_dir = root.join(Utc::now().format("%Y%m%d-%H%M%S%3f").to_string());
        Self {
            session_dir,
            records: HashMap::new(),
        }
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Snapshots `file` exactly once per session; later calls return the
    /// existing record untouched.
    pub fn ensure_backup(&mut self, file: &Path) -> Result<&BackupRecord, EngineError> {
        if !self.records.contains_key(file) {
            let content = std::fs::read(file).map_err(|e| EngineError::io(file, e))?;

            std::fs::create_dir_all(&self.session_dir)
                .map_err(|e| EngineError::io(&self.session_dir, e))?;

            let backup_location = self.session_dir.join(content_hash(
                file.to_string_lossy().as_bytes(),
            ));
            std::fs::write(&backup_location, &content)
                .map_err(|e| EngineError::io(&backup_location, e))?;

            debug!(file = %file.display(), backup = %backup_location.display(), "backup created");
            self.records.insert(
                file.to_path_buf(),
                BackupRecord {
                    file_path: file.to_path_buf(),
                    original_content_hash: content_hash(&content),
                    backup_location,
                    created_at: Utc::now(),
                },
            );
        }
        Ok(&self.records[file])
    }

    pub fn record(&self, file: &Path) -> Option<&BackupRecord> {
        self.records.get(file)
    }

    /// Reverts `file` to its snapshot content, atomically.
    pub fn restore(&self, file: &Path) -> Result<(), EngineError> {
        let record = self.records.get(file).ok_or_else(|| {
            EngineError::Configuration(format!("no backup recorded for {}", file.display()))
        })?;
        let content = std::fs::read_to_string(&record.backup_location)
            .map_err(|e| EngineError::io(&record.backup_location, e))?;
        super::write_atomic(file, &content)
    }

    pub fn records(&self) -> impl Iterator<Item = &BackupRecord> {
        self.records.values()
    }

    /// Explicit user-requested cleanup; backups are never removed implicitly.
    pub fn cleanup(self) -> Result<(), EngineError> {
        if self.session_dir.exists() {
            std::fs::remove_dir_all(&self.session_dir)
                .map_err(|e| EngineError::io(&self.session_dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_is_created_once_per_file() {
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("code.py");
        std::fs::write(&target, "original").unwrap();

        let mut store = BackupStore::new(work.path().join("backups"));
        let first = store.ensure_backup(&target).unwrap().clone();

        // Mutation after the snapshot must not change the recorded hash.
        std::fs::write(&target, "mutated").unwrap();
        let second = store.ensure_backup(&target).unwrap().clone();

        assert_eq!(first.original_content_hash, second.original_content_hash);
        assert_eq!(first.backup_location, second.backup_location);
        assert_eq!(
            std::fs::read_to_string(&first.backup_location).unwrap(),
            "original"
        );
    }

    #[test]
    fn restore_reverts_to_snapshot_content() {
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("code.py");
        std::fs::write(&target, "original").unwrap();

        let mut store = BackupStore::new(work.path().join("backups"));
        store.ensure_backup(&target).unwrap();
        std::fs::write(&target, "clobbered").unwrap();

        store.restore(&target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn restore_without_backup_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        let store = BackupStore::new(work.path().join("backups"));
        assert!(store.restore(Path::new("missing.py")).is_err());
    }

    #[test]
    fn content_hash_is_stable_sha256() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"").len(), 64);
    }
}
