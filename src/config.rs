//! Tunables for the engine and the error handler.
//!
//! Defaults reproduce the stock configuration. Any field can be overridden
//! from JSON; missing fields keep their default.

use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Maximum rules per state row.
pub const MAX_TRANSITIONS_PER_STATE: usize = 5;

/// Capacity of the circular error history.
pub const ERROR_HISTORY_SIZE: usize = 16;

/// Stock timeouts for the states whose limits are not configurable.
pub const PROCESSING_TIMEOUT_MS: u32 = 3000;
pub const CALIBRATION_TIMEOUT_MS: u32 = 5000;
pub const DIAGNOSTICS_TIMEOUT_MS: u32 = 2000;
pub const RECOVERY_TIMEOUT_MS: u32 = 2000;

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Recovery attempts before a normal error is abandoned.
    pub max_recovery_attempts: u8,
    /// Window in which a minor error must self-heal.
    pub minor_error_timeout_ms: u32,
    /// Good messages needed to call the channel verified.
    pub comm_verification_count: u8,
    /// Window for counting good messages.
    pub comm_verification_window_ms: u32,
    /// Timeout of the Init state.
    pub init_timeout_ms: u32,
    /// Timeout of the Communicating state.
    pub comm_timeout_ms: u32,
    /// Advisory tick period for drivers.
    pub task_period_ms: u32,
    /// Escalate a lapsed minor-error window on the next tick instead of
    /// waiting for the next minor report.
    pub escalate_lapsed_minor: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: 3,
            minor_error_timeout_ms: 50,
            comm_verification_count: 3,
            comm_verification_window_ms: 50,
            init_timeout_ms: 5000,
            comm_timeout_ms: 100,
            task_period_ms: 10,
            escalate_lapsed_minor: false,
        }
    }
}

/// A single configuration problem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigViolation {
    #[error("max_recovery_attempts must be at least 1")]
    ZeroRecoveryAttempts,

    #[error("comm_verification_count must be at least 1")]
    ZeroVerificationCount,

    #[error("task_period_ms must be at least 1")]
    ZeroTaskPeriod,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {}", join_violations(.0))]
    Invalid(Vec<ConfigViolation>),
}

fn join_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MachineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Run every check, accumulating ALL violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigViolation>> {
        let checks = vec![
            require(
                self.max_recovery_attempts > 0,
                ConfigViolation::ZeroRecoveryAttempts,
            ),
            require(
                self.comm_verification_count > 0,
                ConfigViolation::ZeroVerificationCount,
            ),
            require(self.task_period_ms > 0, ConfigViolation::ZeroTaskPeriod),
        ];

        Validation::all_vec(checks).map(|_| ())
    }

    /// `validate()` folded into a `Result`.
    pub fn check(&self) -> Result<(), ConfigError> {
        match self.validate() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => {
                Err(ConfigError::Invalid(errors.iter().cloned().collect()))
            }
        }
    }
}

fn require(
    ok: bool,
    violation: ConfigViolation,
) -> Validation<(), NonEmptyVec<ConfigViolation>> {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation)
    }
}
