use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy of the engine.
///
/// Only `Configuration` is fatal, and only before any file has been touched.
/// `Analyzer` degrades to a recorded warning; `StaleFix`, `Io`, `MissingFix`
/// and `Undo` are per-issue outcomes collected into the session report; none
/// of them abort a running session.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("analyzer '{tool}' failed: {reason}")]
    Analyzer { tool: String, reason: String },

    #[error("stale fix: original code no longer present in {}", file.display())]
    StaleFix { file: PathBuf },

    #[error("i/o failure on {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no fix available for issue {issue_id}")]
    MissingFix { issue_id: String },

    #[error("cannot undo issue {issue_id}: {reason}")]
    Undo { issue_id: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn io(file: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }

    /// Short label used as the `reason` on failed decisions.
    pub fn reason(&self) -> String {
        match self {
            Self::StaleFix { .. } => "stale fix".to_string(),
            Self::Io { source, .. } => format!("i/o failure: {source}"),
            Self::Analyzer { tool, reason } => format!("analyzer {tool}: {reason}"),
            Self::MissingFix { .. } => "no fix available".to_string(),
            Self::Undo { reason, .. } => format!("undo: {reason}"),
            Self::Configuration(msg) => format!("configuration: {msg}"),
        }
    }
}
