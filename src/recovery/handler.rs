//! Three-tier error escalation.
//!
//! - Minor: watched for a short window and silently cleared if the channel
//!   probe keeps passing; escalated to Normal if the window lapses.
//! - Normal: becomes the current error and routes the machine into Recovery.
//! - Critical: sets the sticky lockout and forces the terminal state.

use super::channel::ChannelVerifier;
use super::history::ErrorHistory;
use super::info::{ErrorCode, ErrorInfo, ErrorLevel};
use crate::config::MachineConfig;
use crate::core::{Event, State};
use crate::machine::EventSlot;
use crate::platform::{elapsed_between, emit, DebugSink, MessageKind};

/// Per-code recovery override, consulted before the built-in policy.
pub type RecoveryHandler = Box<dyn FnMut(ErrorCode) -> bool + Send>;

/// What the handler needs from its surroundings for one call.
pub struct ErrorScope<'a> {
    pub now_ms: u32,
    pub state: State,
    pub events: &'a EventSlot,
    pub sink: &'a dyn DebugSink,
}

/// How a report was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Minor error inside its window, not healed yet.
    Watching,
    /// Minor error healed silently.
    Healed,
    /// Error became current and ERROR_NORMAL was requested.
    RecoveryRequested,
    /// Lockout engaged.
    LockedOut,
}

/// Result of one recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAttempt {
    /// No active error.
    NothingToRecover,
    /// The error is marked recovered; the caller clears it.
    Recovered { attempt: u8 },
    /// This attempt failed; more remain.
    Failed { attempt: u8 },
    /// The retry ceiling is reached; recovery is abandoned.
    Exhausted { attempts: u8 },
}

impl RecoveryAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NothingToRecover | Self::Recovered { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MinorWindow {
    started_at_ms: u32,
    code: ErrorCode,
    good_messages: u8,
}

pub struct ErrorHandler {
    config: MachineConfig,
    current: Option<ErrorInfo>,
    history: ErrorHistory,
    minor: Option<MinorWindow>,
    channel: ChannelVerifier,
    critical_lock: bool,
    handlers: [Option<RecoveryHandler>; ErrorCode::COUNT],
}

impl ErrorHandler {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            config: *config,
            current: None,
            history: ErrorHistory::new(),
            minor: None,
            channel: ChannelVerifier::new(
                config.comm_verification_window_ms,
                config.comm_verification_count,
            ),
            critical_lock: false,
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Raise an error. The record is written to history before dispatch.
    pub fn report(
        &mut self,
        level: ErrorLevel,
        code: ErrorCode,
        scope: &ErrorScope<'_>,
    ) -> Disposition {
        self.history
            .record(ErrorInfo::new(level, code, scope.now_ms, scope.state));

        match level {
            ErrorLevel::Minor => self.handle_minor(code, scope),
            ErrorLevel::Normal => self.handle_normal(code, scope),
            ErrorLevel::Critical => self.handle_critical(code, scope),
        }
    }

    /// Watch a minor error for self-healing.
    pub fn handle_minor(&mut self, code: ErrorCode, scope: &ErrorScope<'_>) -> Disposition {
        let now = scope.now_ms;
        let window = self.minor.get_or_insert(MinorWindow {
            started_at_ms: now,
            code,
            good_messages: 0,
        });

        if elapsed_between(window.started_at_ms, now) > self.config.minor_error_timeout_ms {
            self.minor = None;
            emit!(
                scope.sink,
                MessageKind::Warning,
                "Minor error timeout - escalating {} to normal",
                code
            );
            return self.handle_normal(code, scope);
        }

        if self.channel.verify(now) {
            window.good_messages = window.good_messages.saturating_add(1);
            if window.good_messages >= self.config.comm_verification_count {
                self.minor = None;
                emit!(scope.sink, MessageKind::Info, "Minor error auto-recovered");
                return Disposition::Healed;
            }
        }

        Disposition::Watching
    }

    /// Make `code` the current error and request Recovery.
    ///
    /// Replaces any error already in flight.
    pub fn handle_normal(&mut self, code: ErrorCode, scope: &ErrorScope<'_>) -> Disposition {
        self.current = Some(ErrorInfo::new(
            ErrorLevel::Normal,
            code,
            scope.now_ms,
            scope.state,
        ));

        emit!(
            scope.sink,
            MessageKind::Warning,
            "Normal error reported: {}",
            code
        );
        if let Err(e) = scope.events.post(Event::ErrorNormal) {
            emit!(scope.sink, MessageKind::Warning, "{}", e);
        }

        Disposition::RecoveryRequested
    }

    /// Lock the machine out. The lock holds even if the event is dropped.
    pub fn handle_critical(&mut self, code: ErrorCode, scope: &ErrorScope<'_>) -> Disposition {
        self.current = Some(ErrorInfo::new(
            ErrorLevel::Critical,
            code,
            scope.now_ms,
            scope.state,
        ));
        self.critical_lock = true;

        emit!(scope.sink, MessageKind::Error, "CRITICAL ERROR: {}", code);
        // Lockout is enforced by the engine regardless of the slot.
        if let Err(e) = scope.events.post(Event::ErrorCritical) {
            emit!(scope.sink, MessageKind::Warning, "{}", e);
        }

        Disposition::LockedOut
    }

    /// Escalate a minor window that lapsed without any further report.
    ///
    /// Returns `None` when there is nothing to escalate.
    pub fn poll_lapsed_minor(&mut self, scope: &ErrorScope<'_>) -> Option<Disposition> {
        let window = self.minor?;
        if elapsed_between(window.started_at_ms, scope.now_ms) <= self.config.minor_error_timeout_ms
        {
            return None;
        }

        self.minor = None;
        emit!(
            scope.sink,
            MessageKind::Warning,
            "Minor error window lapsed - escalating {} to normal",
            window.code
        );
        Some(self.handle_normal(window.code, scope))
    }

    /// Try to recover from the current error.
    pub fn attempt_recovery(&mut self, scope: &ErrorScope<'_>) -> RecoveryAttempt {
        let max = self.config.max_recovery_attempts;
        let Some(current) = self.current.as_mut() else {
            return RecoveryAttempt::NothingToRecover;
        };

        if current.retry_count >= max {
            return RecoveryAttempt::Exhausted {
                attempts: current.retry_count,
            };
        }

        current.retry_count += 1;
        let attempt = current.retry_count;
        if attempt >= max {
            emit!(
                scope.sink,
                MessageKind::Error,
                "Max recovery attempts exceeded for {}",
                current.code
            );
            return RecoveryAttempt::Exhausted { attempts: attempt };
        }

        let code = current.code;
        let recovered = match self.handlers[code.index()].as_mut() {
            Some(handler) => handler(code),
            None => match code {
                ErrorCode::CommLost => self.channel.verify(scope.now_ms),
                // Timeouts are retried optimistically.
                ErrorCode::Timeout => true,
                _ => false,
            },
        };

        if recovered {
            current.recovered = true;
            RecoveryAttempt::Recovered { attempt }
        } else {
            RecoveryAttempt::Failed { attempt }
        }
    }

    /// Drop the current error. Never touches the lockout.
    pub fn clear_error(&mut self) {
        self.current = None;
    }

    /// Probe the communication channel.
    pub fn verify_channel(&mut self, now_ms: u32) -> bool {
        self.channel.verify(now_ms)
    }

    pub fn is_channel_verified(&self) -> bool {
        self.channel.is_verified()
    }

    /// Install a per-code override, returning the previous one.
    pub fn register_recovery_handler(
        &mut self,
        code: ErrorCode,
        handler: RecoveryHandler,
    ) -> Option<RecoveryHandler> {
        self.handlers[code.index()].replace(handler)
    }

    pub fn is_locked_out(&self) -> bool {
        self.critical_lock
    }

    pub(crate) fn engage_lockout(&mut self) {
        self.critical_lock = true;
    }

    pub fn current_error(&self) -> Option<ErrorInfo> {
        self.current
    }

    pub fn history(&self) -> &ErrorHistory {
        &self.history
    }

    /// Whether a minor-error window is open.
    pub fn is_watching_minor(&self) -> bool {
        self.minor.is_some()
    }

    pub(crate) fn restore(
        &mut self,
        current: Option<ErrorInfo>,
        history: ErrorHistory,
        locked_out: bool,
    ) {
        self.current = current;
        self.history = history;
        self.critical_lock = locked_out;
        self.minor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullSink;

    fn scope(slot: &EventSlot, now_ms: u32) -> ErrorScope<'_> {
        ErrorScope {
            now_ms,
            state: State::Active,
            events: slot,
            sink: &NullSink,
        }
    }

    #[test]
    fn every_report_is_recorded_first() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, 5));
        handler.report(ErrorLevel::Normal, ErrorCode::InvalidData, &scope(&slot, 6));

        assert_eq!(handler.history().len(), 2);
        let newest = handler.history().get(0).unwrap();
        assert_eq!(newest.code, ErrorCode::InvalidData);
        assert_eq!(newest.state, State::Active);
        assert_eq!(newest.timestamp_ms, 6);
    }

    #[test]
    fn normal_error_becomes_current_and_posts_event() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        let outcome = handler.report(ErrorLevel::Normal, ErrorCode::Timeout, &scope(&slot, 100));

        assert_eq!(outcome, Disposition::RecoveryRequested);
        assert_eq!(slot.peek(), Some(Event::ErrorNormal));
        let current = handler.current_error().unwrap();
        assert_eq!(current.level, ErrorLevel::Normal);
        assert_eq!(current.retry_count, 0);
        assert!(!handler.is_locked_out());
    }

    #[test]
    fn critical_error_locks_even_when_slot_is_busy() {
        let slot = EventSlot::new();
        slot.post(Event::Start).unwrap();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        let outcome =
            handler.report(ErrorLevel::Critical, ErrorCode::HardwareFault, &scope(&slot, 1));

        assert_eq!(outcome, Disposition::LockedOut);
        assert!(handler.is_locked_out());
        assert_eq!(slot.peek(), Some(Event::Start));

        handler.clear_error();
        assert!(handler.is_locked_out());
    }

    #[test]
    fn dropped_critical_post_is_traced() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Lines(Mutex<Vec<(MessageKind, String)>>);

        impl DebugSink for Lines {
            fn emit(&self, kind: MessageKind, args: std::fmt::Arguments<'_>) {
                self.0.lock().unwrap().push((kind, args.to_string()));
            }
        }

        let slot = EventSlot::new();
        slot.post(Event::DataReady).unwrap();
        let sink = Lines::default();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        let scope = ErrorScope {
            now_ms: 1,
            state: State::Active,
            events: &slot,
            sink: &sink,
        };

        handler.report(ErrorLevel::Critical, ErrorCode::MemoryCorruption, &scope);

        let lines = sink.0.lock().unwrap();
        assert!(lines.iter().any(|(kind, line)| {
            *kind == MessageKind::Warning && line.contains("dropped ERROR_CRITICAL")
        }));
    }

    #[test]
    fn minor_error_heals_when_probe_passes() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        // The probe needs three good messages before it passes, and the
        // minor window needs three passing probes.
        let mut outcomes = Vec::new();
        for t in 0..5 {
            outcomes.push(handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, t)));
        }

        assert_eq!(outcomes[..4], [Disposition::Watching; 4]);
        assert_eq!(outcomes[4], Disposition::Healed);
        assert!(!handler.is_watching_minor());
        assert!(handler.current_error().is_none());
        assert!(!slot.is_occupied());
    }

    #[test]
    fn lapsed_minor_window_escalates_on_next_report() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, 1_000));
        let outcome = handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, 1_051));

        assert_eq!(outcome, Disposition::RecoveryRequested);
        assert_eq!(slot.peek(), Some(Event::ErrorNormal));
        assert_eq!(handler.current_error().unwrap().code, ErrorCode::CommCorrupt);

        // The window was consumed by the escalation.
        assert!(!handler.is_watching_minor());
    }

    #[test]
    fn minor_window_boundary_is_inclusive() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, 1_000));
        let outcome = handler.report(ErrorLevel::Minor, ErrorCode::CommCorrupt, &scope(&slot, 1_050));
        assert_eq!(outcome, Disposition::Watching);
    }

    #[test]
    fn poll_escalates_only_lapsed_windows() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());

        assert_eq!(handler.poll_lapsed_minor(&scope(&slot, 0)), None);
        handler.report(ErrorLevel::Minor, ErrorCode::BufferOverflow, &scope(&slot, 10));
        assert_eq!(handler.poll_lapsed_minor(&scope(&slot, 60)), None);
        assert_eq!(
            handler.poll_lapsed_minor(&scope(&slot, 61)),
            Some(Disposition::RecoveryRequested)
        );
        assert_eq!(handler.current_error().unwrap().code, ErrorCode::BufferOverflow);
    }

    #[test]
    fn recovery_without_error_succeeds() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        let attempt = handler.attempt_recovery(&scope(&slot, 0));
        assert_eq!(attempt, RecoveryAttempt::NothingToRecover);
        assert!(attempt.is_success());
    }

    #[test]
    fn timeout_errors_recover_optimistically() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        handler.report(ErrorLevel::Normal, ErrorCode::Timeout, &scope(&slot, 0));

        let attempt = handler.attempt_recovery(&scope(&slot, 1));
        assert_eq!(attempt, RecoveryAttempt::Recovered { attempt: 1 });

        // Recovered but not cleared.
        let current = handler.current_error().unwrap();
        assert!(current.recovered);
        assert_eq!(current.retry_count, 1);
    }

    #[test]
    fn retry_ceiling_is_never_exceeded() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        handler.report(ErrorLevel::Normal, ErrorCode::HardwareFault, &scope(&slot, 0));

        assert_eq!(
            handler.attempt_recovery(&scope(&slot, 1)),
            RecoveryAttempt::Failed { attempt: 1 }
        );
        assert_eq!(
            handler.attempt_recovery(&scope(&slot, 2)),
            RecoveryAttempt::Failed { attempt: 2 }
        );
        for t in 3..10 {
            assert_eq!(
                handler.attempt_recovery(&scope(&slot, t)),
                RecoveryAttempt::Exhausted { attempts: 3 }
            );
        }
        assert_eq!(handler.current_error().unwrap().retry_count, 3);
    }

    #[test]
    fn comm_lost_recovers_once_channel_verifies() {
        let slot = EventSlot::new();
        let config = MachineConfig {
            max_recovery_attempts: 10,
            ..MachineConfig::default()
        };
        let mut handler = ErrorHandler::new(&config);
        handler.report(ErrorLevel::Normal, ErrorCode::CommLost, &scope(&slot, 0));

        assert!(!handler.attempt_recovery(&scope(&slot, 1)).is_success());
        assert!(!handler.attempt_recovery(&scope(&slot, 2)).is_success());
        assert_eq!(
            handler.attempt_recovery(&scope(&slot, 3)),
            RecoveryAttempt::Recovered { attempt: 3 }
        );
    }

    #[test]
    fn registered_handler_overrides_default_policy() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        let previous = handler.register_recovery_handler(
            ErrorCode::CalibrationFailed,
            Box::new(|code: ErrorCode| code == ErrorCode::CalibrationFailed),
        );
        assert!(previous.is_none());

        handler.report(ErrorLevel::Normal, ErrorCode::CalibrationFailed, &scope(&slot, 0));
        assert_eq!(
            handler.attempt_recovery(&scope(&slot, 1)),
            RecoveryAttempt::Recovered { attempt: 1 }
        );
    }

    #[test]
    fn clear_error_resets_current_slot() {
        let slot = EventSlot::new();
        let mut handler = ErrorHandler::new(&MachineConfig::default());
        handler.report(ErrorLevel::Normal, ErrorCode::InvalidData, &scope(&slot, 0));
        handler.clear_error();
        assert!(handler.current_error().is_none());
        assert_eq!(handler.history().len(), 1);
    }
}
