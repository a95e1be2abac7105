//! The closed set of machine states.
//!
//! Each state addresses one row of the transition table. The set is fixed at
//! build time; only the table contents are mutable.

use super::macros::fixed_enum;

fixed_enum! {
    /// Operating mode of the control loop.
    ///
    /// `CriticalError` is absorbing: once entered the machine is locked out
    /// until it is fully re-initialized.
    pub enum State: 0 {
        /// Power-on initialization.
        Init => "INIT",
        /// Ready, waiting for a start request.
        Idle => "IDLE",
        /// Running, waiting for data.
        Active => "ACTIVE",
        /// Crunching a data set.
        Processing => "PROCESSING",
        /// Exchanging results with the host.
        Communicating => "COMMUNICATING",
        /// Watching system health between data sets.
        Monitoring => "MONITORING",
        /// Sensor calibration.
        Calibrating => "CALIBRATING",
        /// Self test.
        Diagnostics => "DIAGNOSTICS",
        /// Managed recovery from a normal error.
        Recovery => "RECOVERY",
        /// Terminal lockout.
        CriticalError => "CRITICAL_ERROR",
    }
}

impl State {
    /// State entered on init and on reset.
    pub const INITIAL: State = State::Init;

    /// Terminal state forced by the critical lockout.
    pub const LOCKOUT: State = State::CriticalError;

    /// Check if this is the terminal state.
    pub const fn is_final(self) -> bool {
        matches!(self, State::CriticalError)
    }

    /// Check if this state exists to handle a fault.
    pub const fn is_error(self) -> bool {
        matches!(self, State::Recovery | State::CriticalError)
    }
}
