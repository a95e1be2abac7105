//! Error records and their classification.

use crate::core::macros::fixed_enum;
use crate::core::State;
use serde::{Deserialize, Serialize};

fixed_enum! {
    /// Severity tier. Raw code `0` means "no error".
    pub enum ErrorLevel: 1 {
        /// Self-healing; no state change.
        Minor => "MINOR",
        /// Managed recovery through the Recovery state.
        Normal => "NORMAL",
        /// Immediate, sticky lockout.
        Critical => "CRITICAL",
    }
}

fixed_enum! {
    /// Domain error code. Raw code `0` means "no error".
    pub enum ErrorCode: 1 {
        Timeout => "TIMEOUT",
        CommLost => "COMM_LOST",
        CommCorrupt => "COMM_CORRUPT",
        InvalidData => "INVALID_DATA",
        BufferOverflow => "BUFFER_OVERFLOW",
        ResourceUnavailable => "RESOURCE_UNAVAILABLE",
        CalibrationFailed => "CALIBRATION_FAILED",
        HardwareFault => "HARDWARE_FAULT",
        WatchdogReset => "WATCHDOG_RESET",
        MemoryCorruption => "MEMORY_CORRUPTION",
    }
}

/// One reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub level: ErrorLevel,
    pub code: ErrorCode,
    /// Clock reading when the error was raised.
    pub timestamp_ms: u32,
    /// State active when the error was raised.
    pub state: State,
    /// Recovery attempts made so far.
    pub retry_count: u8,
    pub recovered: bool,
}

impl ErrorInfo {
    pub fn new(level: ErrorLevel, code: ErrorCode, timestamp_ms: u32, state: State) -> Self {
        Self {
            level,
            code,
            timestamp_ms,
            state,
            retry_count: 0,
            recovered: false,
        }
    }
}
