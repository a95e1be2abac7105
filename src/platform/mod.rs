//! Contracts for the collaborators the engine is linked against: a clock
//! and a debug sink. Byte transports stay outside the crate.

mod clock;
mod sink;

pub use clock::{elapsed_between, Clock, ManualClock, SystemClock};
pub use sink::{DebugSink, MessageKind, NullSink, TracingSink};

pub(crate) use sink::emit;
