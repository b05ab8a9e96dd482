//! Lists the analyzer descriptors a review run would use.

use anyhow::Result;
use clap::Args;
use colored::*;
use kaizen_engine::AnalyzerRegistry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AnalyzersArgs {
    /// JSON file with analyzer descriptors, overriding the defaults
    #[arg(long, value_name = "FILE")]
    pub analyzers: Option<PathBuf>,
}

pub fn execute(args: AnalyzersArgs) -> Result<()> {
    let mut registry = AnalyzerRegistry::with_defaults();
    if let Some(descriptor_file) = &args.analyzers {
        registry.load_json(descriptor_file)?;
    }
    registry.validate()?;

    println!("{}", "Configured analyzers".bold());
    for descriptor in registry.all() {
        let timeout = descriptor
            .timeout_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "default".to_string());
        println!(
            "  {} {} {}",
            descriptor.name.green().bold(),
            descriptor.command,
            descriptor.args.join(" ").bright_black()
        );
        println!(
            "    extensions: {} | parser: {:?} | timeout: {}",
            descriptor.extensions.join(", "),
            descriptor.parser,
            timeout
        );
    }
    println!(
        "\n{} analyzers, covering: {}",
        registry.len(),
        registry.supported_extensions().join(", ")
    );
    Ok(())
}
