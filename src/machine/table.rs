//! Transition table: one fixed-capacity row per state.

use super::behavior::{Callbacks, StateBehavior};
use super::defaults;
use super::error::TableError;
use crate::config::{
    MachineConfig, CALIBRATION_TIMEOUT_MS, DIAGNOSTICS_TIMEOUT_MS, MAX_TRANSITIONS_PER_STATE,
    PROCESSING_TIMEOUT_MS, RECOVERY_TIMEOUT_MS,
};
use crate::core::{Event, State};
use serde::{Deserialize, Serialize};
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A single `event -> target` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRule {
    pub event: Event,
    pub target: State,
}

impl TransitionRule {
    pub fn new(event: Event, target: State) -> Self {
        Self { event, target }
    }
}

impl fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.event, self.target)
    }
}

const VACANT: TransitionRule = TransitionRule {
    event: Event::InitComplete,
    target: State::Init,
};

/// Row of the table for one state.
pub struct StateConfig {
    state: State,
    behavior: Box<dyn StateBehavior>,
    rules: [TransitionRule; MAX_TRANSITIONS_PER_STATE],
    len: usize,
    timeout_ms: u32,
}

impl StateConfig {
    fn new(state: State, behavior: Box<dyn StateBehavior>) -> Self {
        Self {
            state,
            behavior,
            rules: [VACANT; MAX_TRANSITIONS_PER_STATE],
            len: 0,
            timeout_ms: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules[..self.len]
    }

    /// `0` means the state never times out.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    fn push(&mut self, rule: TransitionRule) -> Result<(), TableError> {
        if self.len >= MAX_TRANSITIONS_PER_STATE {
            return Err(TableError::RulesFull {
                state: self.state,
                capacity: MAX_TRANSITIONS_PER_STATE,
            });
        }
        self.rules[self.len] = rule;
        self.len += 1;
        Ok(())
    }
}

impl fmt::Debug for StateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfig")
            .field("state", &self.state)
            .field("rules", &self.rules())
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Structural problems found by [`TransitionTable::audit`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TableViolation {
    #[error("State {state} has no ERROR_CRITICAL -> CRITICAL_ERROR rule")]
    MissingCriticalEscape { state: State },

    #[error("State {state} lists {event} more than once; later rules are unreachable")]
    DuplicateEvent { state: State, event: Event },
}

/// The full table, indexed by state.
#[derive(Debug)]
pub struct TransitionTable {
    configs: [StateConfig; State::COUNT],
}

impl TransitionTable {
    /// Table with no rules, no timeouts and passive behaviours.
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            configs: std::array::from_fn(|i| {
                StateConfig::new(State::ALL[i], Box::new(super::behavior::Passive))
            }),
        }
    }

    /// Stock table with the default behaviours wired in.
    pub fn canonical(config: &MachineConfig) -> Self {
        use Event::*;
        use State::*;

        let mut table = Self {
            configs: std::array::from_fn(|i| {
                let state = State::ALL[i];
                StateConfig::new(state, defaults::default_behavior(state))
            }),
        };

        let rows: [(State, &[(Event, State)]); State::COUNT] = [
            (
                Init,
                &[
                    (InitComplete, Idle),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                    (Timeout, Recovery),
                ],
            ),
            (
                Idle,
                &[
                    (Start, Active),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Active,
                &[
                    (DataReady, Processing),
                    (Stop, Idle),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Processing,
                &[
                    (ProcessingDone, Communicating),
                    (Timeout, Recovery),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Communicating,
                &[
                    (CommComplete, Monitoring),
                    (Timeout, Recovery),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Monitoring,
                &[
                    (Stop, Idle),
                    (DataReady, Processing),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Calibrating,
                &[
                    (ProcessingDone, Diagnostics),
                    (Timeout, Recovery),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Diagnostics,
                &[
                    (ProcessingDone, Active),
                    (Timeout, Recovery),
                    (ErrorNormal, Recovery),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (
                Recovery,
                &[
                    (RecoverySuccess, Idle),
                    (RecoveryFailed, CriticalError),
                    (Timeout, CriticalError),
                    (ErrorCritical, CriticalError),
                ],
            ),
            (CriticalError, &[]),
        ];

        // Rows never exceed the per-state capacity.
        for (state, rules) in rows {
            let row = table.row_mut(state);
            for &(event, target) in rules {
                row.rules[row.len] = TransitionRule::new(event, target);
                row.len += 1;
            }
        }

        table.set_timeout(Init, config.init_timeout_ms);
        table.set_timeout(Processing, PROCESSING_TIMEOUT_MS);
        table.set_timeout(Communicating, config.comm_timeout_ms);
        table.set_timeout(Calibrating, CALIBRATION_TIMEOUT_MS);
        table.set_timeout(Diagnostics, DIAGNOSTICS_TIMEOUT_MS);
        table.set_timeout(Recovery, RECOVERY_TIMEOUT_MS);

        table
    }

    /// Append a rule at the lowest priority.
    ///
    /// The lockout state is absorbing, so rules leaving it are refused.
    pub fn add_transition(
        &mut self,
        state: State,
        event: Event,
        target: State,
    ) -> Result<(), TableError> {
        if state == State::LOCKOUT {
            return Err(TableError::AbsorbingState { state });
        }
        self.row_mut(state).push(TransitionRule::new(event, target))
    }

    pub fn set_timeout(&mut self, state: State, timeout_ms: u32) {
        self.row_mut(state).timeout_ms = timeout_ms;
    }

    /// Replace the behaviour of `state`, returning the old one.
    pub fn set_behavior(
        &mut self,
        state: State,
        behavior: Box<dyn StateBehavior>,
    ) -> Box<dyn StateBehavior> {
        std::mem::replace(&mut self.row_mut(state).behavior, behavior)
    }

    pub fn set_callbacks(&mut self, state: State, callbacks: Callbacks) -> Box<dyn StateBehavior> {
        self.set_behavior(state, Box::new(callbacks))
    }

    /// Target of the first rule in `state` matching `event`.
    pub fn lookup(&self, state: State, event: Event) -> Option<State> {
        self.row(state)
            .rules()
            .iter()
            .find(|rule| rule.event == event)
            .map(|rule| rule.target)
    }

    pub fn row(&self, state: State) -> &StateConfig {
        &self.configs[state.index()]
    }

    pub fn rules(&self, state: State) -> &[TransitionRule] {
        self.row(state).rules()
    }

    pub fn timeout_ms(&self, state: State) -> u32 {
        self.row(state).timeout_ms
    }

    pub(crate) fn behavior_mut(&mut self, state: State) -> &mut dyn StateBehavior {
        self.row_mut(state).behavior.as_mut()
    }

    fn row_mut(&mut self, state: State) -> &mut StateConfig {
        &mut self.configs[state.index()]
    }

    /// Check the table's structure, accumulating ALL violations.
    pub fn audit(&self) -> Validation<(), NonEmptyVec<TableViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<TableViolation>>> = Vec::new();

        for row in &self.configs {
            let state = row.state;

            if state == State::LOCKOUT {
                continue;
            }

            checks.push(
                if self.lookup(state, Event::ErrorCritical) == Some(State::LOCKOUT) {
                    Validation::success(())
                } else {
                    Validation::fail(TableViolation::MissingCriticalEscape { state })
                },
            );

            let rules = row.rules();
            for (i, rule) in rules.iter().enumerate() {
                // Reported once, at the second occurrence.
                if rules[..i].iter().filter(|r| r.event == rule.event).count() == 1 {
                    checks.push(Validation::fail(TableViolation::DuplicateEvent {
                        state,
                        event: rule.event,
                    }));
                }
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }
}

impl fmt::Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.configs {
            write!(f, "{}", row.state)?;
            if row.timeout_ms > 0 {
                write!(f, " (timeout {} ms)", row.timeout_ms)?;
            }
            writeln!(f, ":")?;
            if row.len == 0 {
                writeln!(f, "    <absorbing>")?;
            }
            for rule in row.rules() {
                writeln!(f, "    {rule}")?;
            }
        }
        Ok(())
    }
}
