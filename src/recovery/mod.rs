//! Error handling and recovery.
//!
//! The handler owns one "current error" slot, a circular history and the
//! critical lockout flag. It raises events into the machine through the
//! pending-event slot and is driven back by the Recovery state.

mod channel;
mod handler;
mod history;
mod info;

pub use channel::ChannelVerifier;
pub use handler::{Disposition, ErrorHandler, ErrorScope, RecoveryAttempt, RecoveryHandler};
pub use history::ErrorHistory;
pub use info::{ErrorCode, ErrorInfo, ErrorLevel};
