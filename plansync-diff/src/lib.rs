//! # plansync-diff
//!
//! Fingerprinting and classification of parsed planning artifacts against the
//! prior sync state.
//!
//! Call [`build_report`] for an in-memory diff, or [`pipeline::run`] to load
//! the inputs from disk and write the report as JSON.

pub mod classify;
pub mod error;
pub mod fingerprint;
pub mod iteration;
pub mod pipeline;
pub mod report;

pub use classify::classify;
pub use error::DiffError;
pub use fingerprint::{fingerprint_epic, fingerprint_story, fingerprint_task};
pub use iteration::{iteration_slug, resolve_iterations};
pub use report::{build_report, estimate_cli_calls};
