//! Builder API for assembling a machine.
//!
//! The builder starts from the canonical table and layers configuration,
//! collaborators and table edits on top before the first tick runs.

pub mod error;
pub mod machine;

pub use error::BuildError;
pub use machine::MachineBuilder;
