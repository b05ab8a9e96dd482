//! Kaizen Engine - Finding Aggregation and Change Application
//!
//! This crate merges findings from multiple static analyzers and LLM review
//! feedback into one ranked, deduplicated issue list, classifies each proposed
//! fix by safety, and drives an accept/reject/undo workflow that mutates files
//! on disk with guaranteed backup and atomic writes.

pub mod aggregate;
pub mod analyzer;
pub mod apply;
pub mod core;
pub mod feedback;
pub mod pipeline;
pub mod report;
pub mod safety;

pub use aggregate::{Aggregator, MergeStats};
pub use analyzer::{
    AnalyzerDescriptor, AnalyzerRegistry, AnalyzerRunner, AnalyzerWarning, OutputParser, RawIssue,
    RunOutcome, SourcedIssue,
};
pub use apply::{
    ApplyEngine, AutoSafeSource, BackupRecord, BackupStore, Decision, DecisionCounts,
    DecisionSource, ScriptedSource, Session, SessionReport,
};
pub use core::{
    ApplyMode, ChangeDecision, DecisionState, EngineConfig, EngineError, Fix, Issue, Safety,
    Severity,
};
pub use feedback::{FeedbackSource, JsonFeedbackSource, MockFeedbackSource};
pub use pipeline::{PipelineTimings, ReviewOutcome, ReviewPipeline};
pub use report::{renderer_for, Renderer, ReportFormat};
pub use safety::SafetyClassifier;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
