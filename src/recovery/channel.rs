//! Windowed good-message counter used as a channel liveness probe.
//!
//! This is a heuristic, not a handshake: each probe inside the window counts
//! as one good message, and a probe outside it restarts the window.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVerifier {
    window_ms: u32,
    required: u8,
    window_start_ms: u32,
    good_messages: u8,
    verified: bool,
}

impl ChannelVerifier {
    pub fn new(window_ms: u32, required: u8) -> Self {
        Self {
            window_ms,
            required,
            window_start_ms: 0,
            good_messages: 0,
            verified: false,
        }
    }

    /// Probe the channel at `now_ms`.
    ///
    /// Inside the window (elapsed `<=` window) the good count is bumped and
    /// the probe passes once it reaches the threshold. Outside the window
    /// the window restarts with a count of one and the probe fails.
    pub fn verify(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.window_start_ms) <= self.window_ms {
            self.good_messages = self.good_messages.saturating_add(1);
            if self.good_messages >= self.required {
                self.verified = true;
                return true;
            }
        } else {
            self.window_start_ms = now_ms;
            self.good_messages = 1;
        }
        false
    }

    /// Whether the threshold has ever been reached since reset.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn good_messages(&self) -> u8 {
        self.good_messages
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_ms, self.required);
    }
}
