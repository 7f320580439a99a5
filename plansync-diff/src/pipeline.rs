//! Diff entrypoint shared by the CLI and tests.

use std::path::Path;

use plansync_core::{input, DiffReport};
use plansync_state::{atomic_write, load_state};

use crate::{build_report, DiffError};

/// Load the parsed artifacts and prior state, diff them, and optionally
/// persist the report as pretty JSON at `output`.
///
/// The parsed artifacts are required. A missing or unreadable prior state is
/// an empty baseline, so a first run classifies everything as NEW.
pub fn run(
    parsed_path: &Path,
    state_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<DiffReport, DiffError> {
    let parsed = input::load_parsed_at(parsed_path)?;
    let state = load_state(state_path);
    if state.is_empty() {
        tracing::info!("no prior sync state, diffing against an empty baseline");
    }

    let report = build_report(&parsed, &state);

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&report)?;
        atomic_write(output, &json)?;
        tracing::info!("wrote diff report to {}", output.display());
    }
    Ok(report)
}
