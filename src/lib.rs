//! Tickfsm: a tick-driven finite state machine core
//!
//! Tickfsm runs a fixed set of states from a periodic tick. Each tick runs
//! the current state's hooks, checks its timeout and drains at most one
//! pending event into a transition lookup. Errors go through a three-tier
//! policy that can recover silently, route the machine into Recovery, or
//! lock it out in a terminal state.
//!
//! # Core Concepts
//!
//! - **State / Event**: closed enums addressing the transition table
//! - **Pending-event slot**: one event at a time, postable from any thread
//! - **Error handler**: minor, normal and critical tiers with a sticky lockout
//! - **Collaborators**: a millisecond `Clock` and a `DebugSink`, both injected
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tickfsm::core::{Event, State};
//! use tickfsm::platform::{ManualClock, NullSink};
//! use tickfsm::recovery::{ErrorCode, ErrorLevel};
//! use tickfsm::{MachineConfig, StateMachine};
//!
//! let clock = ManualClock::new(0);
//! let mut machine = StateMachine::with_platform(
//!     MachineConfig::default(),
//!     Arc::new(clock.clone()),
//!     Arc::new(NullSink),
//! )
//! .unwrap();
//!
//! for _ in 0..5 {
//!     machine.execute_tick();
//! }
//! assert_eq!(machine.current_state(), State::Idle);
//!
//! machine.report_error(ErrorLevel::Normal, ErrorCode::Timeout);
//! assert_eq!(machine.execute_tick(), State::Recovery);
//!
//! // The Recovery state retries the timeout and succeeds.
//! machine.execute_tick();
//! assert_eq!(machine.current_state(), State::Idle);
//! assert!(machine.current_error().is_none());
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod machine;
pub mod platform;
pub mod recovery;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use checkpoint::{CheckpointError, Snapshot};
pub use config::MachineConfig;
pub use crate::core::{Event, State};
pub use machine::{EventPoster, MachineError, PostError, StateBehavior, StateContext, StateMachine};
pub use recovery::{ErrorCode, ErrorInfo, ErrorLevel};
