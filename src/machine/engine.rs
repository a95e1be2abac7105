//! The tick-driven engine.

use super::behavior::{Callbacks, StateBehavior, StateContext};
use super::error::{MachineError, PostError, TableError};
use super::slot::{EventPoster, EventSlot};
use super::stats::MachineStats;
use super::table::TransitionTable;
use crate::builder::{BuildError, MachineBuilder};
use crate::checkpoint::{CheckpointError, Snapshot};
use crate::config::MachineConfig;
use crate::core::{Event, State};
use crate::platform::{elapsed_between, emit, Clock, DebugSink, MessageKind};
use crate::recovery::{
    Disposition, ErrorCode, ErrorHandler, ErrorInfo, ErrorLevel, ErrorScope, RecoveryAttempt,
    RecoveryHandler,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Entry,
    Tick,
    Exit,
}

/// A single machine instance.
///
/// One owner calls [`execute_tick`](Self::execute_tick) on a fixed period.
/// Everything except the pending-event slot is touched only by that owner;
/// other threads post through an [`EventPoster`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tickfsm::core::{Event, State};
/// use tickfsm::machine::StateMachine;
/// use tickfsm::platform::{ManualClock, NullSink};
/// use tickfsm::MachineConfig;
///
/// let clock = ManualClock::new(0);
/// let mut machine = StateMachine::with_platform(
///     MachineConfig::default(),
///     Arc::new(clock.clone()),
///     Arc::new(NullSink),
/// )
/// .unwrap();
///
/// while machine.current_state() == State::Init {
///     clock.advance(10);
///     machine.execute_tick();
/// }
/// assert_eq!(machine.current_state(), State::Idle);
///
/// machine.post_event(Event::Start).unwrap();
/// assert_eq!(machine.execute_tick(), State::Active);
/// ```
pub struct StateMachine {
    config: MachineConfig,
    table: TransitionTable,
    events: Arc<EventSlot>,
    errors: ErrorHandler,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DebugSink>,
    current: State,
    previous: State,
    entered_at_ms: u32,
    execution_count: u32,
    state_changed: bool,
    timeout_posted: bool,
    stats: MachineStats,
}

impl StateMachine {
    /// Canonical machine on the system clock, tracing to `tracing`.
    pub fn new(config: MachineConfig) -> Result<Self, BuildError> {
        MachineBuilder::new().config(config).build()
    }

    /// Canonical machine on caller-supplied collaborators.
    pub fn with_platform(
        config: MachineConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn DebugSink>,
    ) -> Result<Self, BuildError> {
        MachineBuilder::new()
            .config(config)
            .clock(clock)
            .sink(sink)
            .build()
    }

    pub(crate) fn from_parts(
        config: MachineConfig,
        table: TransitionTable,
        errors: ErrorHandler,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn DebugSink>,
    ) -> Self {
        let entered_at_ms = clock.now_ms();
        let machine = Self {
            config,
            table,
            events: Arc::new(EventSlot::new()),
            errors,
            clock,
            sink,
            current: State::INITIAL,
            previous: State::INITIAL,
            entered_at_ms,
            execution_count: 0,
            state_changed: false,
            timeout_posted: false,
            stats: MachineStats::default(),
        };
        emit!(&*machine.sink, MessageKind::Init, "State Machine initialized");
        machine
    }

    /// Run one tick and return the (possibly new) current state.
    ///
    /// Order: lockout check, entry hook if just entered, tick hook, timeout
    /// check, then at most one pending event. State only changes in the
    /// last step or when the lockout forces it. While locked out, pending
    /// events are drained and dropped.
    pub fn execute_tick(&mut self) -> State {
        if self.errors.is_locked_out() {
            if self.current != State::LOCKOUT {
                emit!(
                    &*self.sink,
                    MessageKind::Error,
                    "Critical lock active - forcing {}",
                    State::LOCKOUT
                );
                self.transition_to(State::LOCKOUT);
                return self.current;
            }
        } else if self.config.escalate_lapsed_minor {
            let scope = ErrorScope {
                now_ms: self.clock.now_ms(),
                state: self.current,
                events: &self.events,
                sink: &*self.sink,
            };
            self.errors.poll_lapsed_minor(&scope);
        }

        if self.state_changed {
            self.run_phase(Phase::Entry);
            self.state_changed = false;
            self.entered_at_ms = self.clock.now_ms();
            self.execution_count = 0;
            self.timeout_posted = false;
        }

        self.run_phase(Phase::Tick);
        self.execution_count = self.execution_count.wrapping_add(1);

        self.check_timeout();

        if let Some(event) = self.events.take() {
            // The lockout state is terminal: hooks keep running but events
            // are drained without dispatch.
            if self.errors.is_locked_out() {
                emit!(
                    &*self.sink,
                    MessageKind::Warning,
                    "Event {} ignored - critical error lock active",
                    event
                );
                return self.current;
            }

            match self.table.lookup(self.current, event) {
                Some(next) => {
                    emit!(
                        &*self.sink,
                        MessageKind::Runtime,
                        "Event {} triggers transition {} -> {}",
                        event,
                        self.current,
                        next
                    );
                    self.transition_to(next);
                }
                None => {
                    emit!(
                        &*self.sink,
                        MessageKind::Warning,
                        "No transition for event {} in state {}",
                        event,
                        self.current
                    );
                }
            }
        }

        self.current
    }

    // Posted at most once per visit. A post that loses the slot is retried
    // on the next tick.
    fn check_timeout(&mut self) {
        let timeout_ms = self.table.timeout_ms(self.current);
        if timeout_ms == 0
            || self.timeout_posted
            || !self.clock.elapsed_at_least(self.entered_at_ms, timeout_ms)
        {
            return;
        }

        emit!(
            &*self.sink,
            MessageKind::Warning,
            "State {} timeout after {} ms",
            self.current,
            timeout_ms
        );
        if self.events.post(Event::Timeout).is_ok() {
            self.timeout_posted = true;
            self.stats.record_timeout();
        }
    }

    fn transition_to(&mut self, next: State) {
        self.run_phase(Phase::Exit);

        self.previous = self.current;
        self.current = next;
        self.state_changed = true;
        self.stats.record_transition(next);

        if next == State::LOCKOUT {
            self.errors.engage_lockout();
        }

        emit!(
            &*self.sink,
            MessageKind::Runtime,
            "State transition: {} -> {}",
            self.previous,
            self.current
        );
    }

    fn run_phase(&mut self, phase: Phase) {
        let state = self.current;
        let mut ctx = StateContext {
            state,
            previous: self.previous,
            execution_count: self.execution_count,
            entered_at_ms: self.entered_at_ms,
            now_ms: self.clock.now_ms(),
            events: &self.events,
            errors: &mut self.errors,
            sink: &*self.sink,
        };

        let behavior = self.table.behavior_mut(state);
        match phase {
            Phase::Entry => behavior.on_entry(&mut ctx),
            Phase::Tick => behavior.on_tick(&mut ctx),
            Phase::Exit => behavior.on_exit(&mut ctx),
        }
    }

    /// Store `event` for the next tick; fails if one is already pending.
    pub fn post_event(&self, event: Event) -> Result<(), PostError> {
        self.events.post(event)
    }

    /// Post a raw event code after bounds checking it.
    pub fn post_raw_event(&self, code: u8) -> Result<(), PostError> {
        self.events.post_raw(code)
    }

    /// Handle for posting from another thread or an interrupt context.
    pub fn poster(&self) -> EventPoster {
        EventPoster::new(Arc::clone(&self.events))
    }

    pub fn pending_event(&self) -> Option<Event> {
        self.events.peek()
    }

    /// Clear the current error and return to Init, running the active
    /// state's exit hook. Refused while locked out.
    pub fn reset(&mut self) -> Result<(), MachineError> {
        if self.errors.is_locked_out() {
            emit!(
                &*self.sink,
                MessageKind::Warning,
                "Cannot reset - critical error lock active"
            );
            return Err(MachineError::LockedOut);
        }

        self.errors.clear_error();
        self.transition_to(State::INITIAL);
        emit!(&*self.sink, MessageKind::Info, "State Machine reset to INIT");
        Ok(())
    }

    /// Full re-initialization, the software equivalent of a hardware reset.
    ///
    /// Rebuilds the canonical table (custom rules, behaviours and recovery
    /// handlers are dropped), clears the lockout, the error history, the
    /// stats and the pending event, and returns to Init.
    pub fn reinitialize(&mut self) {
        self.table = TransitionTable::canonical(&self.config);
        self.errors = ErrorHandler::new(&self.config);
        self.events.take();
        self.events.reset_counters();
        self.stats = MachineStats::default();
        self.current = State::INITIAL;
        self.previous = State::INITIAL;
        self.entered_at_ms = self.clock.now_ms();
        self.execution_count = 0;
        self.state_changed = false;
        self.timeout_posted = false;
        emit!(&*self.sink, MessageKind::Init, "State Machine initialized");
    }

    /// Raise an error through the three-tier policy.
    pub fn report_error(&mut self, level: ErrorLevel, code: ErrorCode) -> Disposition {
        let scope = ErrorScope {
            now_ms: self.clock.now_ms(),
            state: self.current,
            events: &self.events,
            sink: &*self.sink,
        };
        self.errors.report(level, code, &scope)
    }

    /// Raise an error from raw codes. Invalid codes are rejected before
    /// anything is written to history.
    pub fn report_raw_error(&mut self, level: u8, code: u8) -> Result<Disposition, MachineError> {
        let level =
            ErrorLevel::from_code(level).ok_or(MachineError::InvalidErrorLevel { code: level })?;
        let code = ErrorCode::from_code(code).ok_or(MachineError::InvalidErrorCode { code })?;
        Ok(self.report_error(level, code))
    }

    /// Run one recovery attempt outside the Recovery state's own hook.
    pub fn attempt_recovery(&mut self) -> RecoveryAttempt {
        let scope = ErrorScope {
            now_ms: self.clock.now_ms(),
            state: self.current,
            events: &self.events,
            sink: &*self.sink,
        };
        self.errors.attempt_recovery(&scope)
    }

    /// Drop the current error. The lockout is untouched.
    pub fn clear_error(&mut self) {
        self.errors.clear_error();
    }

    pub fn verify_channel(&mut self) -> bool {
        self.errors.verify_channel(self.clock.now_ms())
    }

    pub fn register_recovery_handler(
        &mut self,
        code: ErrorCode,
        handler: RecoveryHandler,
    ) -> Option<RecoveryHandler> {
        self.errors.register_recovery_handler(code, handler)
    }

    pub fn add_transition(
        &mut self,
        state: State,
        event: Event,
        target: State,
    ) -> Result<(), TableError> {
        self.table.add_transition(state, event, target)
    }

    pub fn set_timeout(&mut self, state: State, timeout_ms: u32) {
        self.table.set_timeout(state, timeout_ms);
    }

    pub fn set_behavior(
        &mut self,
        state: State,
        behavior: Box<dyn StateBehavior>,
    ) -> Box<dyn StateBehavior> {
        self.table.set_behavior(state, behavior)
    }

    pub fn set_callbacks(&mut self, state: State, callbacks: Callbacks) -> Box<dyn StateBehavior> {
        self.table.set_callbacks(state, callbacks)
    }

    /// Get current state (pure)
    pub fn current_state(&self) -> State {
        self.current
    }

    pub fn previous_state(&self) -> State {
        self.previous
    }

    /// Milliseconds since the current state was entered.
    pub fn state_elapsed_ms(&self) -> u32 {
        elapsed_between(self.entered_at_ms, self.clock.now_ms())
    }

    /// Ticks run since the current state was entered.
    pub fn execution_count(&self) -> u32 {
        self.execution_count
    }

    pub fn is_locked_out(&self) -> bool {
        self.errors.is_locked_out()
    }

    pub fn current_error(&self) -> Option<ErrorInfo> {
        self.errors.current_error()
    }

    /// History by age, `0` being the most recent report.
    pub fn history_entry(&self, index: usize) -> Option<ErrorInfo> {
        self.errors.history().get(index)
    }

    pub fn history_len(&self) -> usize {
        self.errors.history().len()
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn stats(&self) -> MachineStats {
        MachineStats {
            total_events_posted: self.events.posted_count(),
            total_events_dropped: self.events.dropped_count(),
            ..self.stats
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = MachineStats::default();
        self.events.reset_counters();
    }

    /// Capture the runtime context.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            self.current,
            self.previous,
            self.execution_count,
            &self.errors,
            self.stats(),
        )
    }

    /// Restore the runtime context from a snapshot.
    ///
    /// The table and behaviours are left as they are. The entry time is
    /// re-stamped from the clock and the pending slot is emptied. A locked
    /// machine only accepts snapshots that are locked as well.
    pub fn resume_from(&mut self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        snapshot.validate()?;

        // Only reinitialize() may release the lock.
        if self.errors.is_locked_out() && !snapshot.locked_out {
            emit!(
                &*self.sink,
                MessageKind::Warning,
                "Cannot resume - critical error lock active"
            );
            return Err(CheckpointError::LockedOut {
                id: snapshot.id.clone(),
            });
        }

        self.errors.restore(
            snapshot.current_error,
            snapshot.history.clone(),
            snapshot.locked_out,
        );
        self.events.take();
        self.events.reset_counters();
        self.stats = MachineStats {
            total_events_posted: 0,
            total_events_dropped: 0,
            ..snapshot.stats
        };
        self.current = snapshot.current_state;
        self.previous = snapshot.previous_state;
        self.execution_count = snapshot.execution_count;
        self.entered_at_ms = self.clock.now_ms();
        self.state_changed = false;
        self.timeout_posted = false;

        emit!(
            &*self.sink,
            MessageKind::Info,
            "Resumed in {} from snapshot {}",
            self.current,
            snapshot.id
        );
        Ok(())
    }
}
