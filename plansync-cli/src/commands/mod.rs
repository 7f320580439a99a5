pub mod diff;
pub mod status;
pub mod write_state;
