//! plansync: diff planning artifacts against the tracker sync state.
//!
//! # Usage
//!
//! ```text
//! plansync diff --parsed <json> [--sync-state <yaml>] [--output <json>]
//! plansync write-state --diff <json> --results <json> [--output <yaml>]
//!                      [--config <yaml>] [--project <name>] [--iteration-root <path>]
//! plansync status [--sync-state <yaml>] [--json]
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `info` level); stdout
//! carries only command output.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, status::StatusArgs, write_state::WriteStateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "plansync",
    version,
    about = "Incremental sync planning between planning artifacts and a work tracker",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify parsed artifacts against the prior sync state.
    Diff(DiffArgs),

    /// Merge a diff report with sync results and replace the state document.
    WriteState(WriteStateArgs),

    /// Summarize what the state document records.
    Status(StatusArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Diff(args) => args.run(),
        Commands::WriteState(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
