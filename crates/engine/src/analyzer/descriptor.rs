use crate::analyzer::parser::ParserKind;
use crate::core::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced with the target file path in analyzer argument lists.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Data-only description of one external analyzer. Descriptors are validated
/// once at startup; a bad descriptor is the only fatal error class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerDescriptor {
    pub name: String,

    /// Executable to invoke.
    pub command: String,

    /// Arguments, with `{file}` substituted per invocation.
    #[serde(default)]
    pub args: Vec<String>,

    /// File extensions this analyzer applies to (no leading dot).
    pub extensions: Vec<String>,

    /// Per-invocation timeout override; falls back to the engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub parser: ParserKind,
}

impl AnalyzerDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            extensions: Vec::new(),
            timeout_ms: None,
            parser: ParserKind::default(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub fn applies_to(&self, file: &Path) -> bool {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.extensions.iter().any(|e| e == ext)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Configuration(
                "analyzer descriptor has an empty name".to_string(),
            ));
        }
        if self.command.trim().is_empty() {
            return Err(EngineError::Configuration(format!(
                "analyzer '{}' has an empty command",
                self.name
            )));
        }
        if self.extensions.is_empty() {
            return Err(EngineError::Configuration(format!(
                "analyzer '{}' declares no supported extensions",
                self.name
            )));
        }
        if let Some(0) = self.timeout_ms {
            return Err(EngineError::Configuration(format!(
                "analyzer '{}' declares a zero timeout",
                self.name
            )));
        }
        Ok(())
    }

    /// Argument vector for one invocation with `{file}` substituted.
    pub fn render_args(&self, file: &Path) -> Vec<String> {
        let file = file.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(FILE_PLACEHOLDER, &file))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn applies_to_matches_extension() {
        let d = AnalyzerDescriptor::new("pylint", "pylint").with_extensions(["py"]);
        assert!(d.applies_to(Path::new("src/app.py")));
        assert!(!d.applies_to(Path::new("src/app.rs")));
        assert!(!d.applies_to(Path::new("Makefile")));
    }

    #[test]
    fn render_args_substitutes_placeholder() {
        let d = AnalyzerDescriptor::new("t", "tool").with_args(["--check", "{file}"]);
        let args = d.render_args(&PathBuf::from("a.py"));
        assert_eq!(args, vec!["--check".to_string(), "a.py".to_string()]);
    }

    #[test]
    fn validation_rejects_missing_extensions() {
        let d = AnalyzerDescriptor::new("t", "tool");
        assert!(d.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let d = AnalyzerDescriptor::new("t", "tool")
            .with_extensions(["py"])
            .with_timeout_ms(0);
        assert!(d.validate().is_err());
    }
}
