//! Core vocabulary of the machine.
//!
//! - `State`: the closed set of table rows
//! - `Event`: the closed set of transition triggers
//!
//! Both are plain `Copy` enums with bounds-checked raw-code decoding so that
//! interrupt handlers and wire inputs can be validated before they touch the
//! machine.

pub(crate) mod macros;
mod event;
mod state;

pub use event::Event;
pub use state::State;
