mod commands;

use anyhow::Result;
use arena_common::types::Language;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arena-cli")]
#[command(
    about = "Arena CLI - Browse problems, run solutions, and check outputs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the problems in the catalog
    Problems,

    /// Show a problem's statement and starter code
    Show {
        /// Problem id (e.g., two-sum)
        #[arg(short, long)]
        problem: String,

        /// Only print starter code for this language
        #[arg(short, long)]
        language: Option<Language>,
    },

    /// Execute a solution and judge its output
    Run {
        /// Problem id (e.g., two-sum)
        #[arg(short, long)]
        problem: String,

        /// Solution language (javascript, python, java)
        #[arg(short, long)]
        language: Language,

        /// Source file; the starter code is run when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the run report and session state as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Compare two output files the way the judge does
    Check {
        /// File holding the program's output
        #[arg(short, long)]
        actual: PathBuf,

        /// File holding the expected output
        #[arg(short, long)]
        expected: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let json = std::env::var("ARENA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout belongs to command output, logs go to stderr
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let passed = match cli.command {
        Commands::Problems => {
            commands::list_problems()?;
            true
        }
        Commands::Show { problem, language } => {
            commands::show_problem(&problem, language)?;
            true
        }
        Commands::Run {
            problem,
            language,
            file,
            json,
        } => commands::run_solution(&problem, language, file.as_deref(), json).await?,
        Commands::Check { actual, expected } => commands::check_output(&actual, &expected)?,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
