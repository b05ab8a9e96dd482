use crate::analyzer::{AnalyzerDescriptor, ParserKind};
use crate::core::EngineError;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Registry of analyzer descriptors selected at startup. Stored in a
/// `BTreeMap` so iteration order (and therefore runner scheduling and
/// warnings) is deterministic.
pub struct AnalyzerRegistry {
    analyzers: BTreeMap<String, AnalyzerDescriptor>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self {
            analyzers: BTreeMap::new(),
        }
    }

    /// Built-in descriptors for common linters. Projects override or extend
    /// these with a JSON descriptor file.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            AnalyzerDescriptor::new("ruff", "ruff")
                .with_args(["check", "--output-format", "concise", "{file}"])
                .with_extensions(["py"]),
        );
        registry.register(
            AnalyzerDescriptor::new("pylint", "pylint")
                .with_args(["--output-format", "parseable", "{file}"])
                .with_extensions(["py"]),
        );
        registry.register(
            AnalyzerDescriptor::new("eslint", "eslint")
                .with_args(["--format", "unix", "{file}"])
                .with_extensions(["js", "jsx", "ts", "tsx"]),
        );
        registry.register(
            AnalyzerDescriptor::new("shellcheck", "shellcheck")
                .with_args(["--format", "gcc", "{file}"])
                .with_extensions(["sh", "bash"]),
        );
        registry
    }

    pub fn register(&mut self, descriptor: AnalyzerDescriptor) {
        self.analyzers.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&AnalyzerDescriptor> {
        self.analyzers.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &AnalyzerDescriptor> {
        self.analyzers.values()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn applicable_to(&self, file: &Path) -> Vec<&AnalyzerDescriptor> {
        self.analyzers
            .values()
            .filter(|d| d.applies_to(file))
            .collect()
    }

    /// Every extension any registered analyzer covers, for file discovery.
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .analyzers
            .values()
            .flat_map(|d| d.extensions.iter().cloned())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// Loads descriptors from a JSON array file, replacing any default with
    /// the same name.
    pub fn load_json(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading analyzer descriptors from {}", path.display()))?;
        let descriptors: Vec<AnalyzerDescriptor> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing analyzer descriptors in {}", path.display()))?;
        for descriptor in descriptors {
            self.register(descriptor);
        }
        Ok(())
    }

    /// Startup validation; a bad descriptor is fatal before any file is read.
    pub fn validate(&self) -> Result<(), EngineError> {
        for descriptor in self.analyzers.values() {
            descriptor.validate()?;
        }
        Ok(())
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid_and_cover_python() {
        let registry = AnalyzerRegistry::with_defaults();
        registry.validate().unwrap();
        let applicable = registry.applicable_to(&PathBuf::from("m.py"));
        assert!(applicable.iter().any(|d| d.name == "ruff"));
        assert!(applicable.iter().any(|d| d.name == "pylint"));
    }

    #[test]
    fn registering_same_name_overrides() {
        let mut registry = AnalyzerRegistry::with_defaults();
        let before = registry.len();
        registry.register(
            AnalyzerDescriptor::new("ruff", "/opt/ruff")
                .with_extensions(["py"])
                .with_parser(ParserKind::Json),
        );
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("ruff").unwrap().command, "/opt/ruff");
    }

    #[test]
    fn supported_extensions_are_sorted_and_unique() {
        let registry = AnalyzerRegistry::with_defaults();
        let exts = registry.supported_extensions();
        let mut sorted = exts.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(exts, sorted);
        assert!(exts.contains(&"py".to_string()));
    }
}
