//! Bounded, overwrite-oldest history of reported errors.

use super::info::ErrorInfo;
use crate::config::ERROR_HISTORY_SIZE;
use serde::{Deserialize, Serialize};

/// Fixed-capacity ring of past errors.
///
/// Every report lands here before it is dispatched. Once full, each new
/// record overwrites the oldest one. Index `0` always reads the most recent
/// record.
///
/// # Example
///
/// ```rust
/// use tickfsm::core::State;
/// use tickfsm::recovery::{ErrorCode, ErrorHistory, ErrorInfo, ErrorLevel};
///
/// let mut history = ErrorHistory::new();
/// history.record(ErrorInfo::new(ErrorLevel::Minor, ErrorCode::CommCorrupt, 10, State::Idle));
/// history.record(ErrorInfo::new(ErrorLevel::Normal, ErrorCode::Timeout, 20, State::Active));
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.get(0).unwrap().code, ErrorCode::Timeout);
/// assert_eq!(history.get(1).unwrap().code, ErrorCode::CommCorrupt);
/// assert!(history.get(2).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHistory {
    entries: [Option<ErrorInfo>; ERROR_HISTORY_SIZE],
    next: usize,
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHistory {
    pub fn new() -> Self {
        Self {
            entries: [None; ERROR_HISTORY_SIZE],
            next: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        ERROR_HISTORY_SIZE
    }

    /// Append a record, overwriting the oldest one when full.
    pub fn record(&mut self, info: ErrorInfo) {
        self.entries[self.next] = Some(info);
        self.next = (self.next + 1) % ERROR_HISTORY_SIZE;
    }

    /// Read back by age: `0` is the newest record.
    ///
    /// Returns `None` past the capacity or for slots never written.
    pub fn get(&self, index: usize) -> Option<ErrorInfo> {
        if index >= ERROR_HISTORY_SIZE {
            return None;
        }
        let slot = (self.next + ERROR_HISTORY_SIZE - index - 1) % ERROR_HISTORY_SIZE;
        self.entries[slot]
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = ErrorInfo> + '_ {
        (0..ERROR_HISTORY_SIZE).map_while(move |i| self.get(i))
    }
}
