use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the apply engine reaches decisions for each issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// One decision at a time, confirmed by the decision source.
    Interactive,
    /// Auto-accept only `safety = safe` fixes, defer everything else.
    BatchSafeOnly,
    /// Compute decisions and diffs, never write files.
    DryRun,
}

/// Configuration threaded explicitly into the runner, aggregator, classifier
/// and apply engine constructors. The numeric thresholds are defaults, not
/// ground truth; callers may tune them per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bounded worker pool size for analyzer execution.
    pub worker_count: usize,

    /// Hard per-invocation analyzer timeout; on expiry the process is killed.
    pub analyzer_timeout_ms: u64,

    /// Line slack when bucketing issues by overlapping ranges.
    pub proximity_window: usize,

    /// Minimum message token-set overlap ratio for merging two issues.
    pub similarity_threshold: f64,

    /// Mechanical single-line fixes need at least this confidence to be safe.
    pub safe_confidence_floor: f64,

    /// Below this confidence a fix is unsafe regardless of its shape.
    pub unsafe_confidence_ceiling: f64,

    /// Root directory for per-session backup snapshots.
    pub backup_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            analyzer_timeout_ms: 30_000,
            proximity_window: 2,
            similarity_threshold: 0.6,
            safe_confidence_floor: 0.9,
            unsafe_confidence_ceiling: 0.7,
            backup_root: PathBuf::from(".kaizen-backups"),
        }
    }
}

impl EngineConfig {
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    pub fn with_analyzer_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.analyzer_timeout_ms = timeout_ms;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_proximity_window(mut self, window: usize) -> Self {
        self.proximity_window = window;
        self
    }

    pub fn with_backup_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.backup_root = root.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.proximity_window, 2);
        assert_eq!(config.similarity_threshold, 0.6);
        assert_eq!(config.safe_confidence_floor, 0.9);
        assert_eq!(config.unsafe_confidence_ceiling, 0.7);
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn builder_clamps_similarity() {
        let config = EngineConfig::default().with_similarity_threshold(1.4);
        assert_eq!(config.similarity_threshold, 1.0);
    }
}
