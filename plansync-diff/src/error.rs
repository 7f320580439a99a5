//! Error types for plansync-diff.

use thiserror::Error;

use plansync_core::CoreError;
use plansync_state::StateError;

/// All errors that can arise from a diff run.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A required input could not be loaded.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The report could not be written.
    #[error(transparent)]
    State(#[from] StateError),

    /// JSON serialization error (diff report).
    #[error("diff report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
