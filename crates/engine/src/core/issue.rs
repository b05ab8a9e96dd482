use crate::core::{Safety, Severity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A proposed code replacement attached to an issue. `original_code` must be
/// an exact substring of the target file at apply time; the apply engine
/// re-validates this immediately before every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fix {
    pub description: String,

    pub original_code: String,

    pub fixed_code: String,

    pub safety: Safety,

    pub confidence: f64,
}

impl Fix {
    pub fn new(
        description: impl Into<String>,
        original_code: impl Into<String>,
        fixed_code: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            description: description.into(),
            original_code: original_code.into(),
            fixed_code: fixed_code.into(),
            safety: Safety::Unknown,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn with_safety(mut self, safety: Safety) -> Self {
        self.safety = safety;
        self
    }
}

/// A normalized finding from an analyzer or the LLM feedback source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: String,

    pub file: PathBuf,

    pub line_start: usize,

    pub line_end: usize,

    #[serde(default)]
    pub column: usize,

    pub severity: Severity,

    pub source_tools: Vec<String>,

    pub message: String,

    #[serde(default)]
    pub code: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
}

impl Issue {
    pub fn new(
        file: impl Into<PathBuf>,
        line_start: usize,
        line_end: usize,
        severity: Severity,
        source_tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        // Tools occasionally emit inverted ranges; normalize rather than trust.
        let (lo, hi) = if line_start <= line_end {
            (line_start, line_end)
        } else {
            (line_end, line_start)
        };

        Self {
            id: String::new(),
            file: file.into(),
            line_start: lo,
            line_end: hi,
            column: 0,
            severity,
            source_tools: vec![source_tool.into()],
            message: message.into(),
            code: String::new(),
            fixes: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// The fix the apply engine will use: highest confidence first.
    pub fn best_fix(&self) -> Option<&Fix> {
        self.fixes.first()
    }

    pub fn sort_fixes(&mut self) {
        self.fixes.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Two ranges overlap when they touch within `window` lines of slack.
    pub fn overlaps(&self, other: &Issue, window: usize) -> bool {
        if self.file != other.file {
            return false;
        }
        let start = self.line_start.max(other.line_start);
        let end = self.line_end.min(other.line_end);
        start <= end + window
    }
}
