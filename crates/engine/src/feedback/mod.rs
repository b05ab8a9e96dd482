//! Model feedback ingestion
//!
//! Suggestions arrive as normalized issues from an external reviewer (an LLM
//! pass, a prior run, a fixture file). Sources are untrusted: everything they
//! return goes through `sanitize` before it may enter aggregation, so a
//! malformed suggestion can never corrupt ranking or the safety policy.

use crate::core::{Issue, Safety};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Returns fix suggestions for the files under review.
    async fn suggestions(&self, files: &[PathBuf]) -> Result<Vec<Issue>>;

    fn name(&self) -> &str;
}

/// Normalizes suggestions from an external source:
/// - inverted line ranges are swapped, never rejected;
/// - an empty tool list becomes `["llm"]` so merge provenance stays honest;
/// - confidence is clamped to `[0.0, 1.0]`;
/// - any safety claim the source made is discarded; only the local
///   classifier assigns safety;
/// - at most one fix per suggestion, the highest-confidence one; alternatives
///   re-enter later through aggregation when another source proposes them.
pub fn sanitize(mut issues: Vec<Issue>) -> Vec<Issue> {
    for issue in &mut issues {
        if issue.line_start > issue.line_end {
            std::mem::swap(&mut issue.line_start, &mut issue.line_end);
        }
        if issue.source_tools.is_empty() {
            issue.source_tools.push("llm".to_string());
        }
        for fix in &mut issue.fixes {
            fix.confidence = fix.confidence.clamp(0.0, 1.0);
            fix.safety = Safety::Unknown;
        }
        issue.sort_fixes();
        issue.fixes.truncate(1);
    }
    issues
}

/// Reads suggestions from a JSON file holding an array of normalized issues.
pub struct JsonFeedbackSource {
    path: PathBuf,
}

impl JsonFeedbackSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedbackSource for JsonFeedbackSource {
    async fn suggestions(&self, files: &[PathBuf]) -> Result<Vec<Issue>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading feedback file {}", self.path.display()))?;
        let issues: Vec<Issue> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing feedback file {}", self.path.display()))?;

        // Suggestions for files outside the review set are dropped, not
        // errors; feedback files routinely cover a whole repository.
        let scoped: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| files.iter().any(|f| paths_match(f, &issue.file)))
            .collect();
        debug!(
            source = %self.path.display(),
            count = scoped.len(),
            "feedback suggestions loaded"
        );
        Ok(sanitize(scoped))
    }

    fn name(&self) -> &str {
        "json-feedback"
    }
}

/// Feedback files may record paths relative to the repository root while the
/// review set holds absolute paths.
fn paths_match(reviewed: &Path, suggested: &Path) -> bool {
    reviewed == suggested || reviewed.ends_with(suggested) || suggested.ends_with(reviewed)
}

/// Canned suggestions for tests and offline runs.
pub struct MockFeedbackSource {
    suggestions: Vec<Issue>,
    should_fail: bool,
    call_count: std::sync::atomic::AtomicUsize,
}

impl Default for MockFeedbackSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFeedbackSource {
    pub fn new() -> Self {
        Self {
            suggestions: Vec::new(),
            should_fail: false,
            call_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let mut source = Self::new();
        source.should_fail = true;
        source
    }

    pub fn with_suggestion(mut self, issue: Issue) -> Self {
        self.suggestions.push(issue);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackSource for MockFeedbackSource {
    async fn suggestions(&self, files: &[PathBuf]) -> Result<Vec<Issue>> {
        self.call_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.should_fail {
            anyhow::bail!("mock feedback source configured to fail");
        }
        let scoped = self
            .suggestions
            .iter()
            .filter(|issue| files.iter().any(|f| paths_match(f, &issue.file)))
            .cloned()
            .collect();
        Ok(sanitize(scoped))
    }

    fn name(&self) -> &str {
        "mock-feedback"
    }
}
