use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod commands;
use commands::{analyzers::AnalyzersArgs, review::ReviewArgs};

#[derive(Parser)]
#[command(name = "kaizen")]
#[command(about = "Aggregated code review with interactive fix application")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file or directory and review the ranked issues
    Review(ReviewArgs),

    /// List the configured analyzers
    Analyzers(AnalyzersArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(exit_code) => std::process::exit(exit_code),
        // Fatal errors (bad configuration, unreadable targets) exit above the
        // 0/1/2 session codes.
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(3);
        }
    }
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Review(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::review::execute(args))
        }
        Commands::Analyzers(args) => {
            commands::analyzers::execute(args)?;
            Ok(0)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "kaizen=debug" } else { "kaizen=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    // Logs go to stderr; stdout is reserved for the report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
