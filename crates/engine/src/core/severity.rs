use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::Info => write!(f, "Info"),
        }
    }
}

impl Severity {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Low => "🟢",
            Self::Info => "🔵",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "crit" => Some(Self::Critical),
            "high" | "error" => Some(Self::High),
            "medium" | "med" | "warning" | "warn" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" | "informational" | "note" | "hint" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Deterministic judgment of how risky a fix is to apply automatically.
/// `Unknown` is treated as `Unsafe` wherever auto-apply decisions are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    Safe,
    Unsafe,
    Unknown,
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Unsafe => write!(f, "unsafe"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Safety {
    pub fn auto_applicable(&self) -> bool {
        matches!(self, Self::Safe)
    }
}
