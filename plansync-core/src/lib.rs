//! plansync core library: domain types, configuration, input loading, errors.
//!
//! Public API surface:
//! - [`types`]: entities, external identifiers, classification, diff report
//! - [`config`]: [`SyncConfig`] load / override
//! - [`input`]: JSON documents exchanged with the external collaborators
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod input;
pub mod types;

pub use config::SyncConfig;
pub use error::CoreError;
pub use types::{
    Classification, ClassificationCounts, ClassifiedItem, DiffReport, DiffSummary, Entity, Epic,
    ExternalId, IterationDelta, IterationOutcomes, IterationRef, Movement, ParsedArtifacts,
    ParsedIteration, Story, SyncResults, Task,
};
