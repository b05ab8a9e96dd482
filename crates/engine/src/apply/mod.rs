//! Change application
//!
//! Owns the accept/reject/defer/undo workflow and the only code path that
//! writes user files. Strictly single-threaded per session: mutation is
//! serialized per file so the backup/undo invariant stays sound. Every write
//! goes through temp-file-then-atomic-rename; a partial write can never be
//! observed on disk.

pub mod backup;
pub mod engine;
pub mod session;

pub use backup::{content_hash, BackupRecord, BackupStore};
pub use engine::{ApplyEngine, AutoSafeSource, Decision, DecisionSource, ScriptedSource};
pub use session::{DecisionCounts, ReportEntry, Session, SessionReport};

use crate::core::EngineError;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `content` to `path` via a sibling temp file and atomic rename.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), EngineError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = NamedTempFile::new_in(parent.unwrap_or_else(|| Path::new(".")))
        .map_err(|e| EngineError::io(path, e))?;
    std::fs::write(tmp.path(), content).map_err(|e| EngineError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| EngineError::io(path, e.error))?;
    Ok(())
}
