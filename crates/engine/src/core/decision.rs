use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one issue inside a session.
///
/// Legal transitions:
/// `Pending -> {Accepted, Rejected, Deferred}`,
/// `Accepted -> {Applied, ApplyFailed}`,
/// `Applied -> Undone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    Pending,
    Accepted,
    Rejected,
    Deferred,
    Applied,
    ApplyFailed,
    Undone,
}

impl fmt::Display for DecisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
            Self::Applied => "applied",
            Self::ApplyFailed => "apply_failed",
            Self::Undone => "undone",
        };
        write!(f, "{s}")
    }
}

impl DecisionState {
    pub fn can_transition(self, next: DecisionState) -> bool {
        use DecisionState::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Deferred)
                | (Accepted, Applied)
                | (Accepted, ApplyFailed)
                | (Applied, Undone)
        )
    }

    pub fn is_terminal(self) -> bool {
        use DecisionState::*;
        matches!(self, Rejected | Deferred | Applied | ApplyFailed | Undone)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDecision {
    pub issue_id: String,

    pub state: DecisionState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub decided_at: DateTime<Utc>,
}

impl ChangeDecision {
    pub fn pending(issue_id: impl Into<String>) -> Self {
        Self {
            issue_id: issue_id.into(),
            state: DecisionState::Pending,
            reason: None,
            decided_at: Utc::now(),
        }
    }

    /// Moves to `next`, panicking on an illegal transition. State machine
    /// violations are programming errors and must fail loudly, not silently.
    pub fn transition(&mut self, next: DecisionState, reason: Option<String>) {
        if !self.state.can_transition(next) {
            panic!(
                "illegal decision transition for issue {}: {} -> {}",
                self.issue_id, self.state, next
            );
        }
        self.state = next;
        self.reason = reason;
        self.decided_at = Utc::now();
    }
}
