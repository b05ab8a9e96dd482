//! The change-application state machine
//!
//! Consumes the ranked issue list and drives each issue through its decision
//! lifecycle. Decisions come from a `DecisionSource` so the engine stays
//! UI-agnostic: the CLI plugs in a prompt, batch mode plugs in the safety
//! policy, tests plug in a script.
//!
//! Apply guarantees, in order, for every accepted fix:
//! 1. the fix's original code is re-validated against the file as it is on
//!    disk right now, not as it was at analysis time;
//! 2. a backup snapshot exists before the first write to the file;
//! 3. fixes within one file are applied bottom-to-top so earlier edits never
//!    shift the lines of later ones;
//! 4. the write is temp-file-then-rename, so failure leaves the file exactly
//!    as it was.
//!
//! Apply failures are per-issue outcomes, never fatal; the session always
//! reaches a terminal report.

use crate::aggregate::MergeStats;
use crate::analyzer::AnalyzerWarning;
use crate::apply::{write_atomic, BackupStore, Session, SessionReport};
use crate::core::{ApplyMode, DecisionState, EngineConfig, EngineError, Issue, Safety};
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    Defer,
    /// Revert the most recently applied change, then revisit this issue.
    UndoLast,
    /// End the session; everything still pending stays pending.
    Quit,
}

pub trait DecisionSource {
    fn decide(&mut self, issue: &Issue) -> Decision;
}

/// The batch-safe policy as a decision source: accept only fixes classified
/// safe, defer everything else (unknown fails closed).
pub struct AutoSafeSource;

impl DecisionSource for AutoSafeSource {
    fn decide(&mut self, issue: &Issue) -> Decision {
        match issue.best_fix() {
            Some(fix) if fix.safety == Safety::Safe => Decision::Accept,
            _ => Decision::Defer,
        }
    }
}

/// Replays a fixed decision script; defers once the script runs out.
pub struct ScriptedSource {
    script: VecDeque<Decision>,
}

impl ScriptedSource {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: decisions.into_iter().collect(),
        }
    }
}

impl DecisionSource for ScriptedSource {
    fn decide(&mut self, _issue: &Issue) -> Decision {
        self.script.pop_front().unwrap_or(Decision::Defer)
    }
}

pub struct ApplyEngine {
    mode: ApplyMode,
    issues: Vec<Issue>,
    session: Session,
    backups: BackupStore,
}

impl ApplyEngine {
    pub fn new(config: &EngineConfig, mode: ApplyMode, issues: Vec<Issue>) -> Self {
        let mut session = Session::new();
        for issue in &issues {
            session.register(&issue.id);
        }
        Self {
            mode,
            issues,
            session,
            backups: BackupStore::new(&config.backup_root),
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Drives every issue to a decision. In `BatchSafeOnly` the source is
    /// ignored and the safety policy decides.
    pub fn run(&mut self, source: &mut dyn DecisionSource) {
        match self.mode {
            ApplyMode::BatchSafeOnly => self.run_batch(),
            ApplyMode::Interactive | ApplyMode::DryRun => self.run_decisions(source),
        }
    }

    fn run_decisions(&mut self, source: &mut dyn DecisionSource) {
        let mut index = 0;
        while index < self.issues.len() {
            let issue = self.issues[index].clone();
            match source.decide(&issue) {
                Decision::Accept => {
                    self.accept(&issue);
                    index += 1;
                }
                Decision::Reject => {
                    self.session
                        .decision_mut(&issue.id)
                        .transition(DecisionState::Rejected, None);
                    index += 1;
                }
                Decision::Defer => {
                    self.session
                        .decision_mut(&issue.id)
                        .transition(DecisionState::Deferred, None);
                    index += 1;
                }
                Decision::UndoLast => {
                    // Revisit the same issue afterwards; undo decides nothing
                    // about it.
                    if let Some(last) = self.last_applied_issue_id() {
                        if let Err(e) = self.undo(&last) {
                            info!(issue = last, error = %e, "undo failed");
                        }
                    }
                }
                Decision::Quit => break,
            }
        }
    }

    /// Batch-safe-only: decide everything first, then mutate file by file,
    /// bottom-to-top within each file.
    fn run_batch(&mut self) {
        let mut accepted: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        let mut policy = AutoSafeSource;

        for index in 0..self.issues.len() {
            let issue = self.issues[index].clone();
            match policy.decide(&issue) {
                Decision::Accept => {
                    self.session
                        .decision_mut(&issue.id)
                        .transition(DecisionState::Accepted, None);
                    accepted.entry(issue.file.clone()).or_default().push(index);
                }
                _ => {
                    self.session
                        .decision_mut(&issue.id)
                        .transition(DecisionState::Deferred, None);
                }
            }
        }

        for (_, mut indices) in accepted {
            // Descending line order: edits near the bottom never invalidate
            // the line numbers of edits above them.
            indices.sort_by(|a, b| {
                self.issues[*b]
                    .line_start
                    .cmp(&self.issues[*a].line_start)
            });
            for index in indices {
                let issue = self.issues[index].clone();
                self.finish_accepted(&issue);
            }
        }
    }

    /// Consumes the engine into the terminal report.
    pub fn into_report(
        self,
        warnings: Vec<AnalyzerWarning>,
        merge_stats: MergeStats,
    ) -> SessionReport {
        let issues = self.issues;
        self.session.into_report(&issues, warnings, merge_stats)
    }

    fn accept(&mut self, issue: &Issue) {
        self.session
            .decision_mut(&issue.id)
            .transition(DecisionState::Accepted, None);
        self.finish_accepted(issue);
    }

    fn finish_accepted(&mut self, issue: &Issue) {
        let result = if self.mode == ApplyMode::DryRun {
            self.validate_only(issue)
        } else {
            self.apply_fix(issue)
        };

        match result {
            Ok(applied) => {
                if applied {
                    self.session
                        .decision_mut(&issue.id)
                        .transition(DecisionState::Applied, None);
                }
                // Dry run: the decision rests at `accepted`; nothing was
                // written, so claiming `applied` would lie to the report.
            }
            Err(e) => {
                debug!(issue = issue.id, error = %e, "apply failed");
                self.session
                    .decision_mut(&issue.id)
                    .transition(DecisionState::ApplyFailed, Some(e.reason()));
            }
        }
    }

    /// Dry-run path: same re-validation, no backup, no write.
    fn validate_only(&self, issue: &Issue) -> Result<bool, EngineError> {
        let fix = issue.best_fix().ok_or_else(|| EngineError::MissingFix {
            issue_id: issue.id.clone(),
        })?;
        let content =
            std::fs::read_to_string(&issue.file).map_err(|e| EngineError::io(&issue.file, e))?;
        if !content.contains(&fix.original_code) {
            return Err(EngineError::StaleFix {
                file: issue.file.clone(),
            });
        }
        Ok(false)
    }

    fn apply_fix(&mut self, issue: &Issue) -> Result<bool, EngineError> {
        let fix = issue.best_fix().ok_or_else(|| EngineError::MissingFix {
            issue_id: issue.id.clone(),
        })?;

        let content =
            std::fs::read_to_string(&issue.file).map_err(|e| EngineError::io(&issue.file, e))?;

        // The file may have changed since analysis; a fix that no longer
        // matches is stale and is never retried.
        if !content.contains(&fix.original_code) {
            return Err(EngineError::StaleFix {
                file: issue.file.clone(),
            });
        }

        // Backup before the first write to this file, never after.
        self.backups.ensure_backup(&issue.file)?;

        let updated = splice_nearest(
            &content,
            &fix.original_code,
            &fix.fixed_code,
            issue.line_start,
        );
        write_atomic(&issue.file, &updated)?;
        info!(issue = issue.id, file = %issue.file.display(), "fix applied");
        Ok(true)
    }

    fn last_applied_issue_id(&self) -> Option<String> {
        self.session
            .decisions()
            .iter()
            .rev()
            .find(|d| d.state == DecisionState::Applied)
            .map(|d| d.issue_id.clone())
    }

    /// Reverts the file the issue touched to its backup snapshot. Every
    /// applied decision on that file becomes `undone` (the snapshot predates
    /// all of them); still-pending issues on the file simply remain pending
    /// and get re-validated at their own apply time.
    pub fn undo(&mut self, issue_id: &str) -> Result<(), EngineError> {
        let issue = self
            .issues
            .iter()
            .find(|i| i.id == issue_id)
            .cloned()
            .ok_or_else(|| EngineError::Undo {
                issue_id: issue_id.to_string(),
                reason: "unknown issue id".to_string(),
            })?;

        match self.session.decision(issue_id).map(|d| d.state) {
            Some(DecisionState::Applied) => {}
            other => {
                return Err(EngineError::Undo {
                    issue_id: issue_id.to_string(),
                    reason: format!("not applied (state: {other:?})"),
                })
            }
        }

        self.backups.restore(&issue.file)?;

        let undone_ids: Vec<String> = self
            .session
            .decisions()
            .iter()
            .filter(|d| d.state == DecisionState::Applied)
            .filter(|d| {
                self.issues
                    .iter()
                    .any(|i| i.id == d.issue_id && i.file == issue.file)
            })
            .map(|d| d.issue_id.clone())
            .collect();
        for id in undone_ids {
            self.session
                .decision_mut(&id)
                .transition(DecisionState::Undone, Some("file restored from backup".into()));
        }
        Ok(())
    }
}

/// Replaces the occurrence of `original` closest to `line_hint`. Substring
/// search keeps the splice position-independent, the hint disambiguates
/// repeated snippets.
fn splice_nearest(content: &str, original: &str, replacement: &str, line_hint: usize) -> String {
    let mut best: Option<(usize, usize)> = None;
    for (offset, _) in content.match_indices(original) {
        let line = content[..offset].matches('\n').count() + 1;
        let distance = line.abs_diff(line_hint);
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((offset, distance)),
        }
    }

    match best {
        Some((offset, _)) => {
            let mut updated =
                String::with_capacity(content.len() + replacement.len() - original.len().min(content.len()));
            updated.push_str(&content[..offset]);
            updated.push_str(replacement);
            updated.push_str(&content[offset + original.len()..]);
            updated
        }
        // Caller has already verified `contains`; unreachable in practice.
        None => content.to_string(),
    }
}
