//! Error types for plansync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading required inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required input document could not be read (absent, permission denied, ...).
    #[error("required input missing at {path}: {source}")]
    MissingInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input document was read but is not valid JSON for its shape.
    #[error("failed to parse {path}: {source}")]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The YAML configuration file exists but is not valid for [`crate::SyncConfig`].
    #[error("invalid configuration at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
