//! Analyzer execution layer
//!
//! External analyzers are described by data (`AnalyzerDescriptor`), parsed by
//! pluggable `OutputParser` implementations, and executed concurrently by the
//! `AnalyzerRunner` on a bounded worker pool. Everything downstream of this
//! module sees only normalized `RawIssue` lists and warnings; nothing else in
//! the engine is analyzer-aware.

pub mod descriptor;
pub mod parser;
pub mod registry;
pub mod runner;

pub use descriptor::AnalyzerDescriptor;
pub use parser::{ColonParser, JsonParser, OutputParser, ParserKind, RawIssue};
pub use registry::AnalyzerRegistry;
pub use runner::{AnalyzerRunner, AnalyzerWarning, RunOutcome, SourcedIssue};
