//! `plansync diff`: classify parsed artifacts against the prior sync state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use plansync_diff::pipeline;

/// Arguments for `plansync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Parsed artifacts JSON produced by the artifact parser.
    #[arg(long)]
    pub parsed: PathBuf,

    /// Prior sync state document. Missing means a first sync.
    #[arg(long)]
    pub sync_state: Option<PathBuf>,

    /// Also write the report to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let report = pipeline::run(
            &self.parsed,
            self.sync_state.as_deref(),
            self.output.as_deref(),
        )
        .with_context(|| format!("diff failed for '{}'", self.parsed.display()))?;

        // The report goes to stdout even when it was also written to a file.
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize diff JSON")?
        );
        Ok(())
    }
}
