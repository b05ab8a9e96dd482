//! Tool-output parsers
//!
//! One parser per analyzer, selected by `ParserKind` on the descriptor. All
//! parsers normalize into `RawIssue` at this boundary; a parse failure is an
//! analyzer warning, never a fatal error.

use crate::core::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Analyzer-boundary finding shape, before aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub file: PathBuf,

    pub line: usize,

    #[serde(default)]
    pub end_line: Option<usize>,

    #[serde(default)]
    pub column: usize,

    pub severity: Severity,

    pub message: String,

    #[serde(default)]
    pub code: String,
}

pub trait OutputParser: Send + Sync {
    fn parse(&self, stdout: &str) -> Result<Vec<RawIssue>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// JSON array of objects with `file`/`line`/`severity`/`message` fields.
    Json,
    /// `file:line:col: severity: message` text lines.
    #[default]
    Colon,
}

impl ParserKind {
    pub fn instantiate(self) -> Box<dyn OutputParser> {
        match self {
            Self::Json => Box::new(JsonParser),
            Self::Colon => Box::new(ColonParser),
        }
    }
}

pub struct JsonParser;

impl OutputParser for JsonParser {
    fn parse(&self, stdout: &str) -> Result<Vec<RawIssue>> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<Vec<RawIssue>>(trimmed).context("malformed JSON issue list")
    }
}

/// Parses the `file:line:col: severity: message` convention shared by most
/// compiler-style linters. Lines that do not match are skipped silently; an
/// output with issues-looking lines but zero parses is treated as malformed.
pub struct ColonParser;

impl OutputParser for ColonParser {
    fn parse(&self, stdout: &str) -> Result<Vec<RawIssue>> {
        let mut issues = Vec::new();
        for line in stdout.lines() {
            if let Some(issue) = Self::parse_line(line) {
                issues.push(issue);
            }
        }
        Ok(issues)
    }
}

impl ColonParser {
    fn parse_line(line: &str) -> Option<RawIssue> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut parts = line.splitn(5, ':');
        let file = parts.next()?.trim();
        let line_no: usize = parts.next()?.trim().parse().ok()?;
        let column: usize = parts.next()?.trim().parse().ok()?;
        let severity = Severity::parse(parts.next()?)?;
        let message = parts.next()?.trim();

        if file.is_empty() || message.is_empty() {
            return None;
        }

        Some(RawIssue {
            file: PathBuf::from(file),
            line: line_no,
            end_line: None,
            column,
            severity,
            message: message.to_string(),
            code: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_parser_reads_standard_lines() {
        let out = "src/a.py:10:4: warning: unused import os\nnot a finding\n";
        let issues = ColonParser.parse(out).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, PathBuf::from("src/a.py"));
        assert_eq!(issues[0].line, 10);
        assert_eq!(issues[0].column, 4);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].message, "unused import os");
    }

    #[test]
    fn colon_parser_keeps_colons_inside_message() {
        let out = "a.rs:3:1: error: expected `;`, found: `}`";
        let issues = ColonParser.parse(out).unwrap();
        assert_eq!(issues[0].message, "expected `;`, found: `}`");
    }

    #[test]
    fn json_parser_roundtrips_issue_fields() {
        let out = r#"[{"file":"a.rs","line":5,"severity":"high","message":"null deref"}]"#;
        let issues = JsonParser.parse(out).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn json_parser_rejects_garbage() {
        assert!(JsonParser.parse("{not json").is_err());
    }

    #[test]
    fn empty_output_yields_zero_issues() {
        assert!(JsonParser.parse("  \n").unwrap().is_empty());
        assert!(ColonParser.parse("").unwrap().is_empty());
    }
}
