//! Millisecond time source.
//!
//! The engine never sleeps or waits; it polls the clock once per tick. All
//! arithmetic is modulo 2^32 so the machine keeps working across wraparound.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Time provider trait, injectable for testing.
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds, wrapping at 2^32.
    fn now_ms(&self) -> u32;

    /// Wraparound-safe "has `duration_ms` elapsed since `start_ms`".
    fn elapsed_at_least(&self, start_ms: u32, duration_ms: u32) -> bool {
        elapsed_between(start_ms, self.now_ms()) >= duration_ms
    }
}

/// Milliseconds from `start_ms` to `now_ms`, tolerating one wraparound.
#[inline]
pub fn elapsed_between(start_ms: u32, now_ms: u32) -> u32 {
    now_ms.wrapping_sub(start_ms)
}

/// Clock backed by `std::time::Instant`, counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the intended 2^32 wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the machine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    /// Move time forward, wrapping at 2^32.
    pub fn advance(&self, ms: u32) {
        // fetch_add on atomics wraps on overflow.
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
