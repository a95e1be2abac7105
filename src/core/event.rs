//! Events that request state changes or signal conditions.

use super::macros::fixed_enum;

fixed_enum! {
    /// A request to change state, or a signal raised by the error handler.
    ///
    /// Raw code `0` is the "none" sentinel and never names a postable event.
    pub enum Event: 1 {
        InitComplete => "INIT_COMPLETE",
        Start => "START",
        Stop => "STOP",
        DataReady => "DATA_READY",
        ProcessingDone => "PROCESSING_DONE",
        CommRequest => "COMM_REQUEST",
        CommComplete => "COMM_COMPLETE",
        Timeout => "TIMEOUT",
        ErrorMinor => "ERROR_MINOR",
        ErrorNormal => "ERROR_NORMAL",
        ErrorCritical => "ERROR_CRITICAL",
        RecoverySuccess => "RECOVERY_SUCCESS",
        RecoveryFailed => "RECOVERY_FAILED",
    }
}

impl Event {
    /// Raw code of the empty pending-event slot.
    pub const NONE_CODE: u8 = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_code_is_not_an_event() {
        assert_eq!(Event::from_code(Event::NONE_CODE), None);
        assert_eq!(Event::InitComplete.code(), 1);
        assert_eq!(Event::RecoveryFailed.code(), 13);
        assert_eq!(Event::from_code(14), None);
    }

    #[test]
    fn thirteen_named_events() {
        assert_eq!(Event::COUNT, 13);
        assert_eq!(Event::Timeout.to_string(), "TIMEOUT");
    }
}
