//! Errors surfaced by the engine and its administrative API.

use crate::core::{Event, State};
use thiserror::Error;

/// Why an event was not stored in the pending slot.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PostError {
    #[error("Event slot occupied by {pending:?}; dropped {rejected}")]
    SlotOccupied {
        rejected: Event,
        pending: Option<Event>,
    },

    #[error("Raw event code {code} is not a postable event")]
    InvalidEvent { code: u8 },
}

/// Errors from the transition-table mutators.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Transition table full for state {state} (capacity {capacity})")]
    RulesFull { state: State, capacity: usize },

    #[error("State {state} is absorbing and cannot have outgoing rules")]
    AbsorbingState { state: State },
}

/// Errors from engine-level operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("Critical error lock active")]
    LockedOut,

    #[error("Raw error level {code} is not a severity")]
    InvalidErrorLevel { code: u8 },

    #[error("Raw error code {code} is not an error code")]
    InvalidErrorCode { code: u8 },
}
