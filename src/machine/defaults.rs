//! Stock behaviours wired into the canonical table.
//!
//! Apart from Recovery and CriticalError these are demonstration loads:
//! they count ticks and post the event that moves the cycle along.

use super::behavior::{StateBehavior, StateContext};
use crate::core::{Event, State};
use crate::platform::{emit, MessageKind};
use crate::recovery::RecoveryAttempt;

/// Ticks Init spends before posting INIT_COMPLETE.
pub const INIT_REQUIRED_STEPS: u32 = 5;
/// Ticks before Processing posts PROCESSING_DONE.
pub const PROCESSING_CYCLES: u32 = 20;
/// Ticks before Communicating starts probing the channel.
pub const COMM_CYCLES: u32 = 8;
/// Ticks before Calibrating posts PROCESSING_DONE.
pub const CALIBRATION_CYCLES: u32 = 30;
/// Ticks before Diagnostics posts PROCESSING_DONE.
pub const DIAGNOSTIC_CYCLES: u32 = 15;
/// CriticalError re-logs its banner every this many ticks.
pub const ERROR_LOG_INTERVAL: u32 = 100;

/// Behaviour the canonical table installs for `state`.
pub fn default_behavior(state: State) -> Box<dyn StateBehavior> {
    match state {
        State::Init => Box::new(InitSequence::default()),
        State::Idle | State::Active | State::Monitoring => Box::new(Announce),
        State::Processing => Box::new(CountDown::new(
            PROCESSING_CYCLES,
            Event::ProcessingDone,
            "Processing complete",
        )),
        State::Communicating => Box::new(Exchange::default()),
        State::Calibrating => Box::new(CountDown::new(
            CALIBRATION_CYCLES,
            Event::ProcessingDone,
            "Calibration complete",
        )),
        State::Diagnostics => Box::new(CountDown::new(
            DIAGNOSTIC_CYCLES,
            Event::ProcessingDone,
            "Diagnostics passed",
        )),
        State::Recovery => Box::new(RecoveryLoop),
        State::CriticalError => Box::new(Lockout),
    }
}

/// Entry/exit tracing only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Announce;

impl StateBehavior for Announce {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Runtime, "Entering {} state", ctx.state());
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Runtime, "Exiting {} state", ctx.state());
    }
}

/// Counts its own steps so that a machine booting straight into Init
/// (no entry hook yet) still completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitSequence {
    steps: u32,
}

impl StateBehavior for InitSequence {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        self.steps = 0;
        emit!(ctx.sink, MessageKind::Init, "Entering INIT state");
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        self.steps += 1;
        if self.steps >= INIT_REQUIRED_STEPS {
            emit!(
                ctx.sink,
                MessageKind::Init,
                "Initialization complete after {} steps",
                self.steps
            );
            let _ = ctx.post_event(Event::InitComplete);
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Init, "Exiting INIT state");
    }
}

/// Posts `event` once the state has run `cycles` ticks.
#[derive(Debug, Clone, Copy)]
pub struct CountDown {
    cycles: u32,
    event: Event,
    message: &'static str,
}

impl CountDown {
    pub fn new(cycles: u32, event: Event, message: &'static str) -> Self {
        Self {
            cycles,
            event,
            message,
        }
    }
}

impl StateBehavior for CountDown {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Runtime, "Entering {} state", ctx.state());
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.execution_count() >= self.cycles {
            emit!(
                ctx.sink,
                MessageKind::Info,
                "{} after {} cycles",
                self.message,
                ctx.execution_count()
            );
            let _ = ctx.post_event(self.event);
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Runtime, "Exiting {} state", ctx.state());
    }
}

/// Waits a few ticks, then completes once the channel probe passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exchange {
    started: bool,
}

impl StateBehavior for Exchange {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        self.started = false;
        emit!(ctx.sink, MessageKind::Runtime, "Entering COMMUNICATING state");
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        if !self.started {
            emit!(ctx.sink, MessageKind::Info, "Starting communication");
            self.started = true;
        }

        if ctx.execution_count() >= COMM_CYCLES && ctx.verify_channel() {
            emit!(
                ctx.sink,
                MessageKind::Info,
                "Communication complete and verified"
            );
            let _ = ctx.post_event(Event::CommComplete);
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        self.started = false;
        emit!(ctx.sink, MessageKind::Runtime, "Exiting COMMUNICATING state");
    }
}

/// One recovery attempt per tick until success or exhaustion.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryLoop;

impl StateBehavior for RecoveryLoop {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Warning, "Entering RECOVERY state");
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        match ctx.attempt_recovery() {
            RecoveryAttempt::NothingToRecover | RecoveryAttempt::Recovered { .. } => {
                emit!(ctx.sink, MessageKind::Info, "Recovery successful");
                ctx.clear_error();
                let _ = ctx.post_event(Event::RecoverySuccess);
            }
            RecoveryAttempt::Failed { attempt } => {
                emit!(
                    ctx.sink,
                    MessageKind::Runtime,
                    "Recovery attempt {} failed",
                    attempt
                );
            }
            RecoveryAttempt::Exhausted { attempts } => {
                emit!(
                    ctx.sink,
                    MessageKind::Error,
                    "Recovery failed after {} attempts",
                    attempts
                );
                let _ = ctx.post_event(Event::RecoveryFailed);
            }
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Runtime, "Exiting RECOVERY state");
    }
}

/// Terminal state banner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lockout;

impl StateBehavior for Lockout {
    fn on_entry(&mut self, ctx: &mut StateContext<'_>) {
        emit!(ctx.sink, MessageKind::Error, "=== CRITICAL ERROR STATE ===");
        if let Some(error) = ctx.current_error() {
            emit!(
                ctx.sink,
                MessageKind::Error,
                "Error: {} from state {}",
                error.code,
                error.state
            );
            emit!(
                ctx.sink,
                MessageKind::Error,
                "Timestamp: {} ms",
                error.timestamp_ms
            );
        }
        emit!(
            ctx.sink,
            MessageKind::Error,
            "System locked - requires manual reset"
        );
    }

    fn on_tick(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.execution_count() % ERROR_LOG_INTERVAL == 0 {
            emit!(
                ctx.sink,
                MessageKind::Error,
                "System in critical error lock (exec count: {})",
                ctx.execution_count()
            );
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_>) {
        emit!(
            ctx.sink,
            MessageKind::Error,
            "WARNING: Exiting CRITICAL ERROR state unexpectedly"
        );
    }
}
