use crate::aggregate::MergeStats;
use crate::analyzer::AnalyzerWarning;
use crate::core::{ChangeDecision, DecisionState, Issue, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One run of the change-application workflow: the ordered decision log plus
/// aggregate counts. Owned exclusively by the apply engine and turned into a
/// `SessionReport` when the command exits.
pub struct Session {
    started_at: DateTime<Utc>,
    decisions: Vec<ChangeDecision>,
    index: HashMap<String, usize>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            decisions: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, issue_id: &str) {
        if self.index.contains_key(issue_id) {
            return;
        }
        self.index
            .insert(issue_id.to_string(), self.decisions.len());
        self.decisions.push(ChangeDecision::pending(issue_id));
    }

    pub fn decision(&self, issue_id: &str) -> Option<&ChangeDecision> {
        self.index.get(issue_id).map(|&i| &self.decisions[i])
    }

    pub fn decision_mut(&mut self, issue_id: &str) -> &mut ChangeDecision {
        let index = *self
            .index
            .get(issue_id)
            .unwrap_or_else(|| panic!("issue {issue_id} was never registered with the session"));
        &mut self.decisions[index]
    }

    pub fn decisions(&self) -> &[ChangeDecision] {
        &self.decisions
    }

    pub fn counts(&self) -> DecisionCounts {
        let mut counts = DecisionCounts::default();
        for decision in &self.decisions {
            match decision.state {
                DecisionState::Pending => counts.pending += 1,
                DecisionState::Accepted => counts.accepted += 1,
                DecisionState::Rejected => counts.rejected += 1,
                DecisionState::Deferred => counts.deferred += 1,
                DecisionState::Applied => counts.applied += 1,
                DecisionState::ApplyFailed => counts.failed += 1,
                DecisionState::Undone => counts.undone += 1,
            }
        }
        counts
    }

    /// Terminal report; the session is consumed, matching its lifecycle.
    pub fn into_report(
        self,
        issues: &[Issue],
        warnings: Vec<AnalyzerWarning>,
        merge_stats: MergeStats,
    ) -> SessionReport {
        let by_id: HashMap<&str, &Issue> =
            issues.iter().map(|i| (i.id.as_str(), i)).collect();
        let counts = self.counts();
        let entries = self
            .decisions
            .iter()
            .map(|decision| {
                let issue = by_id.get(decision.issue_id.as_str());
                ReportEntry {
                    issue_id: decision.issue_id.clone(),
                    file: issue.map(|i| i.file.clone()).unwrap_or_default(),
                    line_start: issue.map(|i| i.line_start).unwrap_or_default(),
                    severity: issue.map(|i| i.severity).unwrap_or(Severity::Info),
                    source_tools: issue.map(|i| i.source_tools.clone()).unwrap_or_default(),
                    message: issue.map(|i| i.message.clone()).unwrap_or_default(),
                    state: decision.state,
                    reason: decision.reason.clone(),
                }
            })
            .collect();

        SessionReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            counts,
            entries,
            warnings,
            merge_stats,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub deferred: usize,
    pub applied: usize,
    pub failed: usize,
    pub undone: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub issue_id: String,
    pub file: PathBuf,
    pub line_start: usize,
    pub severity: Severity,
    pub source_tools: Vec<String>,
    pub message: String,
    pub state: DecisionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: DecisionCounts,
    pub entries: Vec<ReportEntry>,
    pub warnings: Vec<AnalyzerWarning>,
    pub merge_stats: MergeStats,
}

impl SessionReport {
    /// Process exit code: 0 clean, 1 issues found but not applied, 2 apply
    /// failures occurred. Fatal errors exit above 2 before a report exists.
    pub fn exit_code(&self) -> i32 {
        if self.counts.failed > 0 {
            2
        } else if self.counts.pending
            + self.counts.accepted
            + self.counts.rejected
            + self.counts.deferred
            + self.counts.undone
            > 0
        {
            1
        } else {
            0
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == DecisionState::ApplyFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut session = Session::new();
        session.register("KZ-0001");
        session.register("KZ-0001");
        assert_eq!(session.decisions().len(), 1);
    }

    #[test]
    fn counts_track_states() {
        let mut session = Session::new();
        session.register("KZ-0001");
        session.register("KZ-0002");
        session
            .decision_mut("KZ-0001")
            .transition(DecisionState::Rejected, None);
        let counts = session.counts();
        assert_eq!(counts.rejected, 1);
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn exit_code_distinguishes_outcomes() {
        let clean = SessionReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            counts: DecisionCounts {
                applied: 3,
                ..Default::default()
            },
            entries: Vec::new(),
            warnings: Vec::new(),
            merge_stats: MergeStats::default(),
        };
        assert_eq!(clean.exit_code(), 0);

        let mut unapplied = clean.clone();
        unapplied.counts.deferred = 1;
        assert_eq!(unapplied.exit_code(), 1);

        let mut failed = unapplied.clone();
        failed.counts.failed = 1;
        assert_eq!(failed.exit_code(), 2);
    }
}
