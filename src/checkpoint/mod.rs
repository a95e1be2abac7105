//! Checkpoint and resume of the runtime context.
//!
//! A snapshot holds what a tick mutates: current and previous state, the
//! execution counter, the error handler's current error, history and lockout
//! flag, and the stats. The transition table and behaviours are code, not
//! data, and are not included.

use crate::core::State;
use crate::machine::MachineStats;
use crate::recovery::{ErrorHandler, ErrorHistory, ErrorInfo, ErrorLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a machine's runtime context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    pub current_state: State,

    pub previous_state: State,

    /// Ticks run in the current state
    pub execution_count: u32,

    pub locked_out: bool,

    pub current_error: Option<ErrorInfo>,

    pub history: ErrorHistory,

    pub stats: MachineStats,
}

impl Snapshot {
    pub(crate) fn capture(
        current_state: State,
        previous_state: State,
        execution_count: u32,
        errors: &ErrorHandler,
        stats: MachineStats,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            current_state,
            previous_state,
            execution_count,
            locked_out: errors.is_locked_out(),
            current_error: errors.current_error(),
            history: errors.history().clone(),
            stats,
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject snapshots from another format version or with contents a
    /// running machine could never produce.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        if self.current_state == State::LOCKOUT && !self.locked_out {
            return Err(CheckpointError::ValidationFailed(format!(
                "{} without an active lock",
                State::LOCKOUT
            )));
        }

        if let Some(error) = self.current_error {
            match error.level {
                ErrorLevel::Minor => {
                    return Err(CheckpointError::ValidationFailed(
                        "minor errors never become the current error".to_string(),
                    ));
                }
                ErrorLevel::Critical if !self.locked_out => {
                    return Err(CheckpointError::ValidationFailed(
                        "critical current error without an active lock".to_string(),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
