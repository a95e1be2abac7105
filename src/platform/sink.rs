//! Debug/telemetry sink.
//!
//! The engine describes what it is doing through a `DebugSink`. Sinks never
//! influence control flow, must not block, and cannot fail the caller.

use std::fmt;

/// Class of a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Init,
    Runtime,
    Periodic,
    Error,
    Warning,
    Info,
}

/// Receiver for human-readable trace lines.
///
/// Messages arrive as `fmt::Arguments` so that a discarding sink costs
/// nothing and a formatting sink decides where the text goes.
pub trait DebugSink: Send + Sync {
    fn emit(&self, kind: MessageKind, args: fmt::Arguments<'_>);
}

/// Sink that forwards to `tracing` under the `tickfsm` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&self, kind: MessageKind, args: fmt::Arguments<'_>) {
        match kind {
            MessageKind::Error => tracing::error!(target: "tickfsm", "{}", args),
            MessageKind::Warning => tracing::warn!(target: "tickfsm", "{}", args),
            MessageKind::Info | MessageKind::Init => {
                tracing::info!(target: "tickfsm", kind = ?kind, "{}", args)
            }
            MessageKind::Runtime => tracing::debug!(target: "tickfsm", "{}", args),
            MessageKind::Periodic => tracing::trace!(target: "tickfsm", "{}", args),
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn emit(&self, _kind: MessageKind, _args: fmt::Arguments<'_>) {}
}

/// `emit!(sink, kind, "fmt", args..)` without allocating.
macro_rules! emit {
    ($sink:expr, $kind:expr, $($arg:tt)+) => {
        $crate::platform::DebugSink::emit($sink, $kind, format_args!($($arg)+))
    };
}

pub(crate) use emit;
