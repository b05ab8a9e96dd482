//! The review command: analyze, rank, then walk the decision workflow.
//!
//! Default mode is a dry run; nothing on disk changes unless
//! `--apply-changes` is given. `--batch-safe` (or `--no-confirm`) switches
//! the apply pass to the unattended safe-only policy.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use kaizen_engine::{
    renderer_for, AnalyzerRegistry, ApplyEngine, ApplyMode, AutoSafeSource, Decision,
    DecisionSource, EngineConfig, Issue, JsonFeedbackSource, ReportFormat, ReviewPipeline, Safety,
    SessionReport,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// File or directory to review
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Report format: rich, markdown, html or json
    #[arg(short, long, default_value = "rich")]
    pub format: String,

    /// Mutate files; without this flag the run is a dry run
    #[arg(long)]
    pub apply_changes: bool,

    /// Compute decisions and diffs without writing (the default)
    #[arg(long, conflicts_with = "apply_changes")]
    pub dry_run: bool,

    /// Auto-apply only fixes classified safe, defer everything else
    #[arg(long)]
    pub batch_safe: bool,

    /// Do not prompt; implies the batch-safe policy when applying
    #[arg(long)]
    pub no_confirm: bool,

    /// Root directory for backup snapshots
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// JSON file with model fix suggestions
    #[arg(long, value_name = "FILE")]
    pub feedback: Option<PathBuf>,

    /// JSON file with analyzer descriptors, overriding the defaults
    #[arg(long, value_name = "FILE")]
    pub analyzers: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Analyzer worker pool size
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-analyzer-invocation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

pub async fn execute(args: ReviewArgs) -> Result<i32> {
    let format: ReportFormat = args.format.parse()?;

    let mut config = EngineConfig::default();
    if let Some(jobs) = args.jobs {
        config = config.with_worker_count(jobs);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_analyzer_timeout_ms(timeout_ms);
    }
    if let Some(backup_dir) = &args.backup_dir {
        config = config.with_backup_root(backup_dir);
    }

    let mut registry = AnalyzerRegistry::with_defaults();
    if let Some(descriptor_file) = &args.analyzers {
        registry.load_json(descriptor_file)?;
    }

    let files = discover_files(&args.path, &registry, &config.backup_root)?;
    if files.is_empty() {
        println!("No reviewable files under {}", args.path.display());
        return Ok(0);
    }
    info!(count = files.len(), "files discovered");

    let mut pipeline = ReviewPipeline::new(config.clone()).with_registry(registry);
    if let Some(feedback) = &args.feedback {
        pipeline = pipeline.with_feedback(Box::new(JsonFeedbackSource::new(feedback)));
    }
    let outcome = pipeline.run(&files).await?;

    eprintln!(
        "{} {} raw findings merged into {} issues",
        "ℹ".bright_blue(),
        outcome.merge_stats.input_count,
        outcome.merge_stats.merged_count
    );

    let mode = if args.apply_changes {
        if args.batch_safe || args.no_confirm {
            ApplyMode::BatchSafeOnly
        } else {
            ApplyMode::Interactive
        }
    } else {
        ApplyMode::DryRun
    };

    let mut engine = ApplyEngine::new(&config, mode, outcome.issues);
    match mode {
        ApplyMode::Interactive => {
            let mut prompt = PromptSource::new(engine.issues().len());
            engine.run(&mut prompt);
        }
        _ => engine.run(&mut AutoSafeSource),
    }

    let report = engine.into_report(outcome.warnings, outcome.merge_stats);
    emit_report(&report, format, args.output.as_deref())?;
    Ok(report.exit_code())
}

fn emit_report(report: &SessionReport, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    let rendered = renderer_for(format).render(report)?;
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Walks the target and keeps files with an extension some analyzer covers.
/// Hidden directories and the backup root are skipped; order is sorted so
/// runs are reproducible.
fn discover_files(
    path: &Path,
    registry: &AnalyzerRegistry,
    backup_root: &Path,
) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let extensions = registry.supported_extensions();
    // The backup root may be relative or unnormalized (`dir/../backups`);
    // compare canonical forms, not raw path text.
    let backup_root = canonical_or_raw(backup_root);
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if entry.depth() > 0 && name.starts_with('.') {
                return false;
            }
            !(entry.file_type().is_dir() && canonical_or_raw(entry.path()) == backup_root)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|file| {
            file.extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|known| known == e))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Canonicalizes when the path exists; a backup root that was never created
/// cannot collide with walked entries anyway.
fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Interactive decisions from stdin, one issue at a time with a colored
/// diff preview.
struct PromptSource {
    total: usize,
    shown: usize,
}

impl PromptSource {
    fn new(total: usize) -> Self {
        Self { total, shown: 0 }
    }

    fn show(&mut self, issue: &Issue) {
        self.shown += 1;
        println!();
        println!(
            "{} {} {} {}",
            format!("[{}/{}]", self.shown, self.total).bright_black(),
            issue.severity.glyph(),
            issue.id.bold(),
            format!("{}:{}", issue.file.display(), issue.line_start).cyan()
        );
        println!(
            "  {} {}",
            format!("({})", issue.source_tools.join(", ")).bright_black(),
            issue.message
        );

        match issue.best_fix() {
            Some(fix) => {
                let safety = match fix.safety {
                    Safety::Safe => "safe".green(),
                    Safety::Unsafe => "unsafe".red(),
                    Safety::Unknown => "unknown".yellow(),
                };
                println!(
                    "  fix: {} ({}, confidence {:.2})",
                    fix.description, safety, fix.confidence
                );
                for line in fix.original_code.lines() {
                    println!("    {}", format!("- {line}").red());
                }
                for line in fix.fixed_code.lines() {
                    println!("    {}", format!("+ {line}").green());
                }
            }
            None => println!("  {}", "no fix available".bright_black()),
        }
    }

    fn read_decision(&self) -> Decision {
        loop {
            print!("{}", "  [a]ccept [r]eject [d]efer [u]ndo last [q]uit > ".bold());
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() || line.is_empty() {
                // EOF on stdin ends the session cleanly.
                return Decision::Quit;
            }
            match line.trim().to_lowercase().as_str() {
                "a" | "accept" => return Decision::Accept,
                "r" | "reject" => return Decision::Reject,
                "d" | "defer" | "" => return Decision::Defer,
                "u" | "undo" => return Decision::UndoLast,
                "q" | "quit" => return Decision::Quit,
                other => println!("  unrecognized choice: {other}"),
            }
        }
    }
}

impl DecisionSource for PromptSource {
    fn decide(&mut self, issue: &Issue) -> Decision {
        self.show(issue);
        self.read_decision()
    }
}
