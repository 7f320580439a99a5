//! JSON documents exchanged with the external collaborators.
//!
//! Every document read here is required: an absent or malformed file is a
//! fatal [`CoreError`] and the run aborts before anything is written.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::CoreError;
use crate::types::{DiffReport, ParsedArtifacts, SyncResults};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CoreError::MissingInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CoreError::MalformedInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the artifact parser's output.
pub fn load_parsed_at(path: &Path) -> Result<ParsedArtifacts, CoreError> {
    read_json(path)
}

/// Load a diff report produced by a previous `diff` run.
pub fn load_diff_report_at(path: &Path) -> Result<DiffReport, CoreError> {
    read_json(path)
}

/// Load the sync executor's results.
pub fn load_sync_results_at(path: &Path) -> Result<SyncResults, CoreError> {
    read_json(path)
}
