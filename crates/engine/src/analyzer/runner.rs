use crate::analyzer::{AnalyzerDescriptor, AnalyzerRegistry, RawIssue};
use crate::core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A degraded analyzer invocation: crash, timeout, or malformed output.
/// Warnings never abort the run; they surface in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerWarning {
    pub tool: String,
    pub file: PathBuf,
    pub reason: String,
}

/// A parsed finding plus the analyzer that produced it; aggregation needs
/// the provenance to union tool lists when findings merge.
#[derive(Debug, Clone)]
pub struct SourcedIssue {
    pub tool: String,
    pub raw: RawIssue,
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub issues_by_file: BTreeMap<PathBuf, Vec<SourcedIssue>>,
    pub warnings: Vec<AnalyzerWarning>,
}

impl RunOutcome {
    pub fn total_issues(&self) -> usize {
        self.issues_by_file.values().map(Vec::len).sum()
    }

    pub fn into_issues(self) -> (Vec<SourcedIssue>, Vec<AnalyzerWarning>) {
        let issues = self.issues_by_file.into_values().flatten().collect();
        (issues, self.warnings)
    }
}

/// Runs every applicable (analyzer, file) pair concurrently on a bounded
/// worker pool. Each invocation is isolated: one analyzer failing, timing
/// out, or printing garbage degrades to zero issues from that pair plus a
/// recorded warning.
pub struct AnalyzerRunner {
    config: EngineConfig,
}

impl AnalyzerRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, registry: &AnalyzerRegistry, files: &[PathBuf]) -> RunOutcome {
        let mut units: Vec<(AnalyzerDescriptor, PathBuf)> = Vec::new();
        for file in files {
            for descriptor in registry.applicable_to(file) {
                units.push((descriptor.clone(), file.clone()));
            }
        }

        let pool = Arc::new(Semaphore::new(self.config.worker_count.max(1)));
        let default_timeout = self.config.analyzer_timeout_ms;
        let mut tasks = JoinSet::new();

        for (index, (descriptor, file)) in units.into_iter().enumerate() {
            let pool = Arc::clone(&pool);
            tasks.spawn(async move {
                // Semaphore closes only on drop, which cannot happen while
                // this task still holds a clone.
                let _permit = pool.acquire_owned().await.expect("worker pool closed");
                let timeout_ms = descriptor.timeout_ms.unwrap_or(default_timeout);
                let result = invoke_analyzer(&descriptor, &file, timeout_ms).await;
                (index, descriptor.name, file, result)
            });
        }

        // Completion order is nondeterministic; re-sort by submission index so
        // identical inputs always produce identical outcomes.
        let mut completed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => completed.push(entry),
                Err(e) => warn!("analyzer task panicked: {e}"),
            }
        }
        completed.sort_by_key(|(index, ..)| *index);

        let mut outcome = RunOutcome::default();
        for (_, tool, file, result) in completed {
            match result {
                Ok(issues) => {
                    debug!(tool, file = %file.display(), count = issues.len(), "analyzer finished");
                    outcome.issues_by_file.entry(file).or_default().extend(
                        issues.into_iter().map(|raw| SourcedIssue {
                            tool: tool.clone(),
                            raw,
                        }),
                    );
                }
                Err(reason) => {
                    warn!(tool, file = %file.display(), reason, "analyzer degraded to zero issues");
                    outcome.warnings.push(AnalyzerWarning { tool, file, reason });
                }
            }
        }
        outcome
    }
}

async fn invoke_analyzer(
    descriptor: &AnalyzerDescriptor,
    file: &PathBuf,
    timeout_ms: u64,
) -> Result<Vec<RawIssue>, String> {
    let mut command = tokio::process::Command::new(&descriptor.command);
    command
        .args(descriptor.render_args(file))
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        // Dropping the pending output future on timeout must also kill the
        // child, or a wedged analyzer would outlive its invocation.
        .kill_on_drop(true);

    let output = match tokio::time::timeout(Duration::from_millis(timeout_ms), command.output())
        .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("failed to spawn: {e}")),
        Err(_) => return Err(format!("timed out after {timeout_ms}ms")),
    };

    // Exit code 1 conventionally means "findings reported" for linters, so
    // only 2+ (or signal death) counts as a tool failure.
    match output.status.code() {
        Some(0) | Some(1) => {}
        Some(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "exited with code {code}: {}",
                stderr.lines().next().unwrap_or("")
            ));
        }
        None => return Err("killed by signal".to_string()),
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    descriptor
        .parser
        .instantiate()
        .parse(&stdout)
        .map_err(|e| format!("malformed output: {e}"))
}
