//! Runtime counters.

use crate::core::State;
use serde::{Deserialize, Serialize};

/// Counters accumulated since init or the last `reset_stats`.
///
/// Event counters are read from the pending-event slot when the stats are
/// requested; the rest is kept by the tick owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineStats {
    pub total_transitions: u32,
    pub total_events_posted: u32,
    pub total_events_dropped: u32,
    pub total_timeouts: u32,
    /// Indexed by `State::index()`.
    pub state_entry_counts: [u32; State::COUNT],
}

impl MachineStats {
    pub fn entries(&self, state: State) -> u32 {
        self.state_entry_counts[state.index()]
    }

    pub(crate) fn record_transition(&mut self, target: State) {
        self.total_transitions = self.total_transitions.wrapping_add(1);
        let count = &mut self.state_entry_counts[target.index()];
        *count = count.wrapping_add(1);
    }

    pub(crate) fn record_timeout(&mut self) {
        self.total_timeouts = self.total_timeouts.wrapping_add(1);
    }
}
