//! The state-machine execution engine.
//!
//! - `StateMachine`: owns the runtime context and runs one tick at a time
//! - `TransitionTable`: per-state rules, timeout and behaviour
//! - `EventSlot` / `EventPoster`: the single pending-event register, the
//!   only piece of state shared across execution contexts
//! - `StateBehavior`: entry/tick/exit hooks, with stock implementations in
//!   `defaults`

mod behavior;
pub mod defaults;
mod engine;
mod error;
mod slot;
mod stats;
mod table;

pub use behavior::{Callbacks, Hook, Passive, StateBehavior, StateContext};
pub use defaults::default_behavior;
pub use engine::StateMachine;
pub use error::{MachineError, PostError, TableError};
pub use slot::{EventPoster, EventSlot};
pub use stats::MachineStats;
pub use table::{StateConfig, TableViolation, TransitionRule, TransitionTable};
