//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::config::MachineConfig;
use crate::core::{Event, State};
use crate::machine::{StateBehavior, StateMachine, TransitionTable};
use crate::platform::{Clock, DebugSink, SystemClock, TracingSink};
use crate::recovery::{ErrorCode, ErrorHandler, RecoveryHandler};
use stillwater::validation::Validation;
use std::sync::Arc;

/// Builder for constructing state machines with a fluent API.
///
/// Rules added here are appended after the canonical rules of their state,
/// so they only fire for events the canonical row does not already handle.
///
/// # Example
///
/// ```rust
/// use tickfsm::builder::MachineBuilder;
/// use tickfsm::core::{Event, State};
/// use tickfsm::platform::NullSink;
/// use std::sync::Arc;
///
/// let machine = MachineBuilder::new()
///     .sink(Arc::new(NullSink))
///     .transition(State::Idle, Event::CommRequest, State::Calibrating)
///     .timeout(State::Monitoring, 10_000)
///     .strict()
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     machine.table().lookup(State::Idle, Event::CommRequest),
///     Some(State::Calibrating)
/// );
/// ```
pub struct MachineBuilder {
    config: MachineConfig,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn DebugSink>>,
    transitions: Vec<(State, Event, State)>,
    timeouts: Vec<(State, u32)>,
    behaviors: Vec<(State, Box<dyn StateBehavior>)>,
    recovery_handlers: Vec<(ErrorCode, RecoveryHandler)>,
    strict: bool,
}

impl MachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: MachineConfig::default(),
            clock: None,
            sink: None,
            transitions: Vec::new(),
            timeouts: Vec::new(),
            behaviors: Vec::new(),
            recovery_handlers: Vec::new(),
            strict: false,
        }
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Trace sink. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Append a rule to `state`'s row.
    pub fn transition(mut self, state: State, event: Event, target: State) -> Self {
        self.transitions.push((state, event, target));
        self
    }

    pub fn timeout(mut self, state: State, timeout_ms: u32) -> Self {
        self.timeouts.push((state, timeout_ms));
        self
    }

    /// Replace the stock behaviour of `state`.
    pub fn behavior(mut self, state: State, behavior: Box<dyn StateBehavior>) -> Self {
        self.behaviors.push((state, behavior));
        self
    }

    pub fn recovery_handler(mut self, code: ErrorCode, handler: RecoveryHandler) -> Self {
        self.recovery_handlers.push((code, handler));
        self
    }

    /// Refuse to build if the finished table fails [`TransitionTable::audit`].
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Build the state machine.
    /// Returns an error if the configuration or table edits are invalid.
    pub fn build(self) -> Result<StateMachine, BuildError> {
        if let Validation::Failure(violations) = self.config.validate() {
            return Err(BuildError::InvalidConfig(violations.iter().cloned().collect()));
        }

        let mut table = TransitionTable::canonical(&self.config);
        for (state, event, target) in self.transitions {
            table.add_transition(state, event, target)?;
        }
        for (state, timeout_ms) in self.timeouts {
            table.set_timeout(state, timeout_ms);
        }
        for (state, behavior) in self.behaviors {
            table.set_behavior(state, behavior);
        }

        if self.strict {
            if let Validation::Failure(violations) = table.audit() {
                return Err(BuildError::TableAudit(violations.iter().copied().collect()));
            }
        }

        let mut errors = ErrorHandler::new(&self.config);
        for (code, handler) in self.recovery_handlers {
            errors.register_recovery_handler(code, handler);
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));

        Ok(StateMachine::from_parts(
            self.config,
            table,
            errors,
            clock,
            sink,
        ))
    }
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
