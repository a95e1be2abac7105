//! Whole-machine scenarios driven by a hand-advanced clock.

use std::fmt;
use std::sync::{Arc, Mutex};
use tickfsm::core::{Event, State};
use tickfsm::machine::{defaults, Callbacks, StateContext, StateMachine};
use tickfsm::platform::{DebugSink, ManualClock, MessageKind};
use tickfsm::recovery::{Disposition, ErrorCode, ErrorLevel};
use tickfsm::{CheckpointError, MachineBuilder, MachineConfig, Snapshot};

#[derive(Default)]
struct Capture {
    lines: Mutex<Vec<(MessageKind, String)>>,
}

impl Capture {
    fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(_, line)| line.contains(needle))
    }
}

impl DebugSink for Capture {
    fn emit(&self, kind: MessageKind, args: fmt::Arguments<'_>) {
        self.lines.lock().unwrap().push((kind, args.to_string()));
    }
}

struct Rig {
    machine: StateMachine,
    clock: ManualClock,
    trace: Arc<Capture>,
}

impl Rig {
    fn new(config: MachineConfig) -> Self {
        let clock = ManualClock::new(10_000);
        let trace = Arc::new(Capture::default());
        let machine = MachineBuilder::new()
            .config(config)
            .clock(Arc::new(clock.clone()))
            .sink(trace.clone())
            .build()
            .unwrap();
        Self {
            machine,
            clock,
            trace,
        }
    }

    fn tick(&mut self) -> State {
        self.clock.advance(10);
        self.machine.execute_tick()
    }

    fn tick_until(&mut self, state: State, limit: usize) {
        for _ in 0..limit {
            if self.tick() == state {
                return;
            }
        }
        panic!(
            "did not reach {state} within {limit} ticks, stuck in {}",
            self.machine.current_state()
        );
    }

    fn booted() -> Self {
        let mut rig = Self::new(MachineConfig::default());
        for _ in 0..4 {
            assert_eq!(rig.tick(), State::Init);
        }
        assert_eq!(rig.tick(), State::Idle);
        rig
    }
}

#[test]
fn boot_then_start() {
    let mut rig = Rig::booted();
    assert!(rig.trace.contains("Initialization complete after 5 steps"));
    assert!(rig.trace.contains("State transition: INIT -> IDLE"));

    rig.machine.post_event(Event::Start).unwrap();
    assert_eq!(rig.tick(), State::Active);
    assert_eq!(rig.machine.previous_state(), State::Idle);
}

#[test]
fn full_data_cycle() {
    let mut rig = Rig::booted();
    rig.machine.post_event(Event::Start).unwrap();
    rig.tick();
    rig.machine.post_event(Event::DataReady).unwrap();
    assert_eq!(rig.tick(), State::Processing);

    rig.tick_until(State::Communicating, 25);
    rig.tick_until(State::Monitoring, 15);
    assert!(rig.trace.contains("Communication complete and verified"));

    rig.machine.post_event(Event::Stop).unwrap();
    assert_eq!(rig.tick(), State::Idle);

    let stats = rig.machine.stats();
    assert_eq!(stats.entries(State::Idle), 2);
    assert_eq!(stats.entries(State::Processing), 1);
    assert_eq!(stats.total_timeouts, 0);
}

#[test]
fn normal_error_recovers_through_recovery_state() {
    let mut rig = Rig::booted();
    rig.machine.post_event(Event::Start).unwrap();
    rig.tick();

    let outcome = rig
        .machine
        .report_error(ErrorLevel::Normal, ErrorCode::Timeout);
    assert_eq!(outcome, Disposition::RecoveryRequested);
    assert_eq!(rig.tick(), State::Recovery);

    assert_eq!(rig.tick(), State::Idle);
    assert!(rig.machine.current_error().is_none());
    assert!(!rig.machine.is_locked_out());
    assert!(rig.trace.contains("Recovery successful"));
}

#[test]
fn unrecoverable_error_ends_in_lockout() {
    let mut rig = Rig::booted();
    rig.machine.post_event(Event::Start).unwrap();
    rig.tick();

    rig.machine
        .report_error(ErrorLevel::Normal, ErrorCode::InvalidData);
    assert_eq!(rig.tick(), State::Recovery);

    // Two failing attempts, then the third reaches the ceiling and the
    // RECOVERY_FAILED it posts is processed in the same tick.
    assert_eq!(rig.tick(), State::Recovery);
    assert_eq!(rig.tick(), State::Recovery);
    assert_eq!(rig.tick(), State::CriticalError);
    assert_eq!(rig.machine.current_error().unwrap().retry_count, 3);

    assert!(rig.machine.is_locked_out());
    assert!(rig.machine.reset().is_err());
    for _ in 0..10 {
        let _ = rig.machine.post_event(Event::Start);
        assert_eq!(rig.tick(), State::CriticalError);
    }
    assert!(rig.machine.is_locked_out());
    assert!(rig.trace.contains("System locked - requires manual reset"));
    assert!(rig.trace.contains("Cannot reset - critical error lock active"));
}

#[test]
fn recovery_timeout_is_fatal() {
    let mut rig = Rig::booted();
    rig.machine.set_behavior(State::Recovery, Box::new(defaults::Announce));
    rig.machine
        .report_error(ErrorLevel::Normal, ErrorCode::ResourceUnavailable);
    assert_eq!(rig.tick(), State::Recovery);

    rig.tick_until(State::CriticalError, 300);
    assert_eq!(rig.machine.previous_state(), State::Recovery);
    assert!(rig.machine.is_locked_out());
    assert!(rig.machine.stats().total_timeouts >= 1);
}

#[test]
fn communicating_times_out_without_verification() {
    let mut rig = Rig::booted();
    rig.machine
        .set_behavior(State::Communicating, Box::new(defaults::Announce));
    rig.machine
        .add_transition(State::Idle, Event::CommRequest, State::Communicating)
        .unwrap();

    rig.machine.post_event(Event::CommRequest).unwrap();
    assert_eq!(rig.tick(), State::Communicating);

    // 100 ms timeout at 10 ms per tick.
    rig.tick_until(State::Recovery, 15);
    assert!(rig.trace.contains("State COMMUNICATING timeout after 100 ms"));
}

#[test]
fn minor_error_heals_without_transition() {
    let mut rig = Rig::booted();
    let outcomes: Vec<Disposition> = (0..5)
        .map(|_| {
            rig.machine
                .report_error(ErrorLevel::Minor, ErrorCode::CommCorrupt)
        })
        .collect();
    assert_eq!(outcomes[3], Disposition::Watching);
    assert_eq!(outcomes[4], Disposition::Healed);
    assert_eq!(rig.machine.pending_event(), None);
    assert_eq!(rig.tick(), State::Idle);
    assert_eq!(rig.machine.history_len(), 5);
}

#[test]
fn lapsed_minor_error_waits_for_next_report_by_default() {
    let mut rig = Rig::booted();
    rig.machine
        .report_error(ErrorLevel::Minor, ErrorCode::BufferOverflow);
    for _ in 0..10 {
        assert_eq!(rig.tick(), State::Idle);
    }

    let outcome = rig
        .machine
        .report_error(ErrorLevel::Minor, ErrorCode::BufferOverflow);
    assert_eq!(outcome, Disposition::RecoveryRequested);
    assert_eq!(rig.tick(), State::Recovery);
}

#[test]
fn lapsed_minor_error_escalates_on_tick_when_enabled() {
    let mut rig = Rig::new(MachineConfig {
        escalate_lapsed_minor: true,
        ..MachineConfig::default()
    });
    for _ in 0..5 {
        rig.tick();
    }
    rig.machine
        .report_error(ErrorLevel::Minor, ErrorCode::BufferOverflow);

    rig.tick_until(State::Recovery, 10);
    assert_eq!(
        rig.machine.current_error().unwrap().code,
        ErrorCode::BufferOverflow
    );
}

#[test]
fn callbacks_drive_custom_states() {
    let mut rig = Rig::booted();
    rig.machine
        .add_transition(State::Idle, Event::CommRequest, State::Calibrating)
        .unwrap();
    rig.machine.set_callbacks(
        State::Calibrating,
        Callbacks::new(
            None,
            Some(Box::new(|ctx: &mut StateContext<'_>| {
                if ctx.execution_count() == 2 {
                    let _ = ctx.post_event(Event::ProcessingDone);
                }
            })),
            None,
        ),
    );

    rig.machine.post_event(Event::CommRequest).unwrap();
    assert_eq!(rig.tick(), State::Calibrating);
    assert_eq!(rig.tick(), State::Calibrating);
    assert_eq!(rig.tick(), State::Calibrating);
    assert_eq!(rig.tick(), State::Diagnostics);
    rig.tick_until(State::Active, 20);
}

#[test]
fn registered_handler_rescues_unknown_code() {
    let mut rig = Rig::booted();
    rig.machine.register_recovery_handler(
        ErrorCode::CalibrationFailed,
        Box::new(|_: ErrorCode| true),
    );
    rig.machine
        .report_error(ErrorLevel::Normal, ErrorCode::CalibrationFailed);
    assert_eq!(rig.tick(), State::Recovery);
    assert_eq!(rig.tick(), State::Idle);
}

#[test]
fn history_keeps_latest_reports() {
    let mut rig = Rig::booted();
    for _ in 0..20 {
        rig.machine
            .report_error(ErrorLevel::Minor, ErrorCode::CommCorrupt);
        rig.clock.advance(1);
    }
    rig.machine
        .report_error(ErrorLevel::Normal, ErrorCode::WatchdogReset);

    assert_eq!(rig.machine.history_len(), 16);
    let newest = rig.machine.history_entry(0).unwrap();
    assert_eq!(newest.code, ErrorCode::WatchdogReset);
    assert_eq!(newest.state, State::Idle);
    assert!(rig.machine.history_entry(16).is_none());
}

#[test]
fn snapshot_resume_restores_lockout() {
    let mut rig = Rig::booted();
    rig.machine
        .report_error(ErrorLevel::Critical, ErrorCode::HardwareFault);
    assert_eq!(rig.tick(), State::CriticalError);
    let snapshot = rig.machine.snapshot();

    let mut fresh = Rig::new(MachineConfig::default());
    let encoded = snapshot.to_binary().unwrap();
    fresh
        .machine
        .resume_from(&Snapshot::from_binary(&encoded).unwrap())
        .unwrap();

    assert!(fresh.machine.is_locked_out());
    assert_eq!(fresh.machine.current_state(), State::CriticalError);
    assert_eq!(fresh.machine.previous_state(), State::Idle);
    assert_eq!(fresh.tick(), State::CriticalError);
    assert_eq!(fresh.machine.history_len(), 1);
}

#[test]
fn stale_snapshot_cannot_unlock() {
    let mut rig = Rig::booted();
    let before_fault = rig.machine.snapshot();
    rig.machine
        .report_error(ErrorLevel::Critical, ErrorCode::MemoryCorruption);
    assert_eq!(rig.tick(), State::CriticalError);

    let encoded = before_fault.to_json().unwrap();
    let result = rig
        .machine
        .resume_from(&Snapshot::from_json(&encoded).unwrap());

    assert!(matches!(result, Err(CheckpointError::LockedOut { .. })));
    assert!(rig.machine.is_locked_out());
    assert_eq!(rig.tick(), State::CriticalError);
    assert!(rig.trace.contains("Cannot resume - critical error lock active"));
}

#[test]
fn lockout_holds_against_custom_rules_and_events() {
    let mut rig = Rig::booted();
    assert!(rig
        .machine
        .add_transition(State::CriticalError, Event::Start, State::Idle)
        .is_err());

    rig.machine
        .report_error(ErrorLevel::Critical, ErrorCode::HardwareFault);
    rig.tick();
    rig.tick();
    rig.machine.post_event(Event::Start).unwrap();
    assert_eq!(rig.tick(), State::CriticalError);
    assert!(rig.machine.is_locked_out());
    assert!(rig
        .trace
        .contains("Event START ignored - critical error lock active"));
}

#[test]
fn reinitialize_models_hardware_reset() {
    let mut rig = Rig::booted();
    rig.machine
        .report_error(ErrorLevel::Critical, ErrorCode::WatchdogReset);
    rig.tick();
    assert!(rig.machine.is_locked_out());

    rig.machine.reinitialize();
    assert!(!rig.machine.is_locked_out());
    assert_eq!(rig.machine.current_state(), State::Init);
    rig.tick_until(State::Idle, 5);
    rig.machine.post_event(Event::Start).unwrap();
    assert_eq!(rig.tick(), State::Active);
}
