//! # plansync-state
//!
//! Reader and writer for the line-oriented sync state document.
//!
//! Call [`load_state`] at the start of a run (never fails; a missing file is an
//! empty baseline) and [`write_state`] at the end to replace the document
//! atomically with the next generation.

pub mod error;
pub mod reader;
pub mod sort;
pub mod writer;

pub use error::StateError;
pub use reader::{
    load_state, parse_state, Section, StateHeader, StateRecord, SyncState, DEFAULT_STATE_FILE,
};
pub use sort::{compare_ids, sort_ids};
pub use writer::{atomic_write, build_iteration_map, write_state, WriteCounts};
