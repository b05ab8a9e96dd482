//! Deduplication and ranking
//!
//! Merges analyzer issues and LLM-sourced issues into a single ranked list.
//! Identity is structural: same file, overlapping line ranges within the
//! proximity window, and message signatures above the similarity threshold.
//! Merging never downgrades severity and keeps every fix, ordered by
//! confidence. Given identical inputs the output is byte-identical, which the
//! test fixtures rely on.

pub mod similarity;

use crate::core::{EngineConfig, Issue, Severity};
use serde::{Deserialize, Serialize};
use similarity::message_similarity;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeStats {
    pub input_count: usize,
    pub merged_count: usize,
    pub collapsed_count: usize,
}

impl MergeStats {
    pub fn reduction_percentage(&self) -> f64 {
        if self.input_count == 0 {
            0.0
        } else {
            (self.collapsed_count as f64 / self.input_count as f64) * 100.0
        }
    }
}

pub struct Aggregator {
    proximity_window: usize,
    similarity_threshold: f64,
}

impl Aggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            proximity_window: config.proximity_window,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Merges all candidates into one deduplicated, deterministically ranked
    /// list and assigns stable issue ids.
    pub fn aggregate(&self, candidates: Vec<Issue>) -> (Vec<Issue>, MergeStats) {
        let input_count = candidates.len();

        // Canonical candidate order first, so bucketing does not depend on
        // analyzer completion order.
        let mut candidates = candidates;
        candidates.sort_by(|a, b| {
            (&a.file, a.line_start, a.line_end, &a.message, &a.source_tools).cmp(&(
                &b.file,
                b.line_start,
                b.line_end,
                &b.message,
                &b.source_tools,
            ))
        });

        let mut by_file: BTreeMap<PathBuf, Vec<Issue>> = BTreeMap::new();
        for candidate in candidates {
            let merged = by_file.entry(candidate.file.clone()).or_default();
            let slot = merged.iter_mut().find(|existing| {
                existing.overlaps(&candidate, self.proximity_window)
                    && message_similarity(&existing.message, &candidate.message)
                        >= self.similarity_threshold
            });
            match slot {
                Some(existing) => merge_into(existing, candidate),
                None => merged.push(candidate),
            }
        }

        let mut issues: Vec<Issue> = by_file.into_values().flatten().collect();
        for issue in &mut issues {
            issue.sort_fixes();
        }

        // Severity desc, then tool count desc (issues flagged by more tools
        // surface first), then path/line/message for a total, stable order.
        issues.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.source_tools.len().cmp(&a.source_tools.len()))
                .then(a.file.cmp(&b.file))
                .then(a.line_start.cmp(&b.line_start))
                .then(a.message.cmp(&b.message))
        });

        for (index, issue) in issues.iter_mut().enumerate() {
            issue.id = format!("KZ-{:04}", index + 1);
        }

        let merged_count = issues.len();
        let stats = MergeStats {
            input_count,
            merged_count,
            collapsed_count: input_count - merged_count,
        };
        (issues, stats)
    }
}

/// Collapses `candidate` into `existing`: highest severity wins and carries
/// its message, tools are unioned, the line range widens to cover both, and
/// all fixes are retained as alternatives.
fn merge_into(existing: &mut Issue, candidate: Issue) {
    if candidate.severity > existing.severity {
        existing.severity = candidate.severity;
        existing.message = candidate.message;
        if !candidate.code.is_empty() {
            existing.code = candidate.code;
        }
    }
    existing.line_start = existing.line_start.min(candidate.line_start);
    existing.line_end = existing.line_end.max(candidate.line_end);

    for tool in candidate.source_tools {
        if !existing.source_tools.contains(&tool) {
            existing.source_tools.push(tool);
        }
    }
    existing.source_tools.sort();

    existing.fixes.extend(candidate.fixes);
}
