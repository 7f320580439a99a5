//! `plansync write-state`: merge a diff report with sync results and replace
//! the state document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use plansync_core::{
    config::{self, DEFAULT_CONFIG_FILE},
    input,
};
use plansync_state::{write_state, DEFAULT_STATE_FILE};

/// Arguments for `plansync write-state`.
#[derive(Args, Debug)]
pub struct WriteStateArgs {
    /// Diff report JSON from `plansync diff`.
    #[arg(long)]
    pub diff: PathBuf,

    /// Sync executor results JSON.
    #[arg(long)]
    pub results: PathBuf,

    /// State document to replace. Prior iterations are read from it first.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub output: PathBuf,

    /// Optional YAML config with `projectName` and `iterationRootPath`.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Tracker project name (overrides the config file).
    #[arg(long, env = "PLANSYNC_PROJECT")]
    pub project: Option<String>,

    /// Iteration root path (overrides the config file).
    #[arg(long, env = "PLANSYNC_ITERATION_ROOT")]
    pub iteration_root: Option<String>,
}

impl WriteStateArgs {
    pub fn run(self) -> Result<()> {
        let report = input::load_diff_report_at(&self.diff).context("failed to load diff report")?;
        let results =
            input::load_sync_results_at(&self.results).context("failed to load sync results")?;
        let config = config::load_at(&self.config)
            .with_context(|| format!("failed to load config '{}'", self.config.display()))?
            .with_overrides(self.project, self.iteration_root);
        tracing::debug!("config: {config:?}");

        let counts = write_state(&report, &results, &config, Utc::now(), &self.output)
            .with_context(|| format!("failed to write '{}'", self.output.display()))?;

        println!("Sync state written to {}", self.output.display());
        println!(
            "  epics: {}  stories: {} ({} pending)  tasks: {} ({} pending)  iterations: {}",
            counts.epics,
            counts.stories,
            counts.pending_stories,
            counts.tasks,
            counts.pending_tasks,
            counts.iterations,
        );
        Ok(())
    }
}
