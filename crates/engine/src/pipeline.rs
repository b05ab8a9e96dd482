//! Review pipeline
//!
//! Orchestrates one review pass: run the analyzers, pull feedback
//! suggestions, aggregate everything into the ranked issue list, then
//! annotate fix safety. The pipeline never mutates files; its output feeds
//! the apply engine.

use crate::aggregate::{Aggregator, MergeStats};
use crate::analyzer::{AnalyzerRegistry, AnalyzerRunner, AnalyzerWarning, SourcedIssue};
use crate::core::{EngineConfig, Issue};
use crate::feedback::FeedbackSource;
use crate::safety::SafetyClassifier;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineTimings {
    pub analysis_ms: u64,
    pub feedback_ms: u64,
    pub aggregation_ms: u64,
    pub total_ms: u64,
}

pub struct ReviewOutcome {
    pub issues: Vec<Issue>,
    pub warnings: Vec<AnalyzerWarning>,
    pub merge_stats: MergeStats,
    pub timings: PipelineTimings,
}

pub struct ReviewPipeline {
    config: EngineConfig,
    registry: AnalyzerRegistry,
    feedback: Option<Box<dyn FeedbackSource>>,
}

impl ReviewPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: AnalyzerRegistry::with_defaults(),
            feedback: None,
        }
    }

    pub fn with_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_feedback(mut self, source: Box<dyn FeedbackSource>) -> Self {
        self.feedback = Some(source);
        self
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub async fn run(&self, files: &[PathBuf]) -> Result<ReviewOutcome> {
        let started = Instant::now();
        self.registry.validate()?;

        let analysis_start = Instant::now();
        let runner = AnalyzerRunner::new(self.config.clone());
        let outcome = runner.run(&self.registry, files).await;
        let (sourced, mut warnings) = outcome.into_issues();
        let analysis_ms = analysis_start.elapsed().as_millis() as u64;
        info!(
            findings = sourced.len(),
            warnings = warnings.len(),
            "analyzer pass finished"
        );

        let mut candidates: Vec<Issue> = sourced.into_iter().map(normalize).collect();

        let feedback_start = Instant::now();
        if let Some(source) = &self.feedback {
            // A degraded feedback source reduces the run to analyzer findings
            // only; it never aborts the review.
            match source.suggestions(files).await {
                Ok(suggestions) => {
                    info!(
                        source = source.name(),
                        count = suggestions.len(),
                        "feedback suggestions received"
                    );
                    candidates.extend(suggestions);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "feedback source failed");
                    warnings.push(AnalyzerWarning {
                        tool: source.name().to_string(),
                        file: PathBuf::new(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        let feedback_ms = feedback_start.elapsed().as_millis() as u64;

        let aggregation_start = Instant::now();
        let (mut issues, merge_stats) = Aggregator::new(&self.config).aggregate(candidates);
        SafetyClassifier::new(&self.config).annotate(&mut issues);
        let aggregation_ms = aggregation_start.elapsed().as_millis() as u64;

        info!(
            issues = issues.len(),
            collapsed = merge_stats.collapsed_count,
            "review pipeline finished"
        );
        Ok(ReviewOutcome {
            issues,
            warnings,
            merge_stats,
            timings: PipelineTimings {
                analysis_ms,
                feedback_ms,
                aggregation_ms,
                total_ms: started.elapsed().as_millis() as u64,
            },
        })
    }
}

/// Analyzer-boundary shape to the aggregation shape. A missing end line means
/// a single-line finding.
fn normalize(sourced: SourcedIssue) -> Issue {
    let raw = sourced.raw;
    let end_line = raw.end_line.unwrap_or(raw.line);
    let mut issue = Issue::new(
        raw.file,
        raw.line,
        end_line,
        raw.severity,
        sourced.tool,
        raw.message,
    )
    .with_column(raw.column);
    if !raw.code.is_empty() {
        issue = issue.with_code(raw.code);
    }
    issue
}
