//! Per-state behaviour hooks.

use super::error::PostError;
use super::slot::EventSlot;
use crate::core::{Event, State};
use crate::platform::{elapsed_between, DebugSink, MessageKind};
use crate::recovery::{
    Disposition, ErrorCode, ErrorHandler, ErrorInfo, ErrorLevel, ErrorScope, RecoveryAttempt,
};
use std::fmt;

/// Entry/tick/exit behaviour of one state.
///
/// Hooks run on the tick owner, must return quickly and must not block.
/// Every hook has a no-op default, so a state only implements what it needs.
///
/// # Example
///
/// ```rust
/// use tickfsm::core::Event;
/// use tickfsm::machine::{StateBehavior, StateContext};
///
/// struct Sampler {
///     samples: u32,
/// }
///
/// impl StateBehavior for Sampler {
///     fn on_entry(&mut self, _ctx: &mut StateContext<'_>) {
///         self.samples = 0;
///     }
///
///     fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
///         self.samples += 1;
///         if self.samples == 10 {
///             let _ = ctx.post_event(Event::DataReady);
///         }
///     }
/// }
/// ```
pub trait StateBehavior: Send {
    fn on_entry(&mut self, _ctx: &mut StateContext<'_>) {}
    fn on_tick(&mut self, _ctx: &mut StateContext<'_>) {}
    fn on_exit(&mut self, _ctx: &mut StateContext<'_>) {}
}

/// Behaviour that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passive;

impl StateBehavior for Passive {}

/// Closure-based hook.
pub type Hook = Box<dyn FnMut(&mut StateContext<'_>) + Send>;

/// Behaviour assembled from up to three optional closures.
#[derive(Default)]
pub struct Callbacks {
    pub entry: Option<Hook>,
    pub tick: Option<Hook>,
    pub exit: Option<Hook>,
}

impl Callbacks {
    pub fn new(entry: Option<Hook>, tick: Option<Hook>, exit: Option<Hook>) -> Self {
        Self { entry, tick, exit }
    }
}

impl StateBehavior for Callbacks {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        if let Some(hook) = self.entry.as_mut() {
            hook(ctx);
        }
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        if let Some(hook) = self.tick.as_mut() {
            hook(ctx);
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        if let Some(hook) = self.exit.as_mut() {
            hook(ctx);
        }
    }
}

/// View of the machine handed to a running hook.
pub struct StateContext<'a> {
    pub(crate) state: State,
    pub(crate) previous: State,
    pub(crate) execution_count: u32,
    pub(crate) entered_at_ms: u32,
    pub(crate) now_ms: u32,
    pub(crate) events: &'a EventSlot,
    pub(crate) errors: &'a mut ErrorHandler,
    pub(crate) sink: &'a dyn DebugSink,
}

impl<'a> StateContext<'a> {
    /// State whose hook is running.
    pub fn state(&self) -> State {
        self.state
    }

    pub fn previous_state(&self) -> State {
        self.previous
    }

    /// Ticks run in the current state before this one.
    pub fn execution_count(&self) -> u32 {
        self.execution_count
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    pub fn state_elapsed_ms(&self) -> u32 {
        elapsed_between(self.entered_at_ms, self.now_ms)
    }

    pub fn post_event(&mut self, event: Event) -> Result<(), PostError> {
        self.events.post(event)
    }

    pub fn report_error(&mut self, level: ErrorLevel, code: ErrorCode) -> Disposition {
        let scope = self.scope();
        self.errors.report(level, code, &scope)
    }

    pub fn attempt_recovery(&mut self) -> RecoveryAttempt {
        let scope = self.scope();
        self.errors.attempt_recovery(&scope)
    }

    pub fn clear_error(&mut self) {
        self.errors.clear_error();
    }

    pub fn current_error(&self) -> Option<ErrorInfo> {
        self.errors.current_error()
    }

    pub fn verify_channel(&mut self) -> bool {
        self.errors.verify_channel(self.now_ms)
    }

    pub fn is_locked_out(&self) -> bool {
        self.errors.is_locked_out()
    }

    pub fn emit(&self, kind: MessageKind, args: fmt::Arguments<'_>) {
        self.sink.emit(kind, args);
    }

    fn scope(&self) -> ErrorScope<'a> {
        ErrorScope {
            now_ms: self.now_ms,
            state: self.state,
            events: self.events,
            sink: self.sink,
        }
    }
}
