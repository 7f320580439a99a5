//! Error types for plansync-state.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from writing the state document. Reading never fails.
#[derive(Debug, Error)]
pub enum StateError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`StateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
