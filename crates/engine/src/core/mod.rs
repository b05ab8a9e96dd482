//! Core abstractions for the review engine
//!
//! Fundamental building blocks shared by every stage: the normalized issue
//! model produced at the analyzer boundary, the decision lifecycle driven by
//! the apply engine, the configuration struct threaded through constructors,
//! and the error taxonomy that separates fatal startup problems from per-issue
//! failures collected into the final report.

pub mod config;
pub mod decision;
pub mod error;
pub mod issue;
pub mod severity;

pub use config::{ApplyMode, EngineConfig};
pub use decision::{ChangeDecision, DecisionState};
pub use error::EngineError;
pub use issue::{Fix, Issue};
pub use severity::{Safety, Severity};
