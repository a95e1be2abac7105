//! Single-capacity pending-event register.
//!
//! This is the only state that crosses the concurrency boundary: the tick
//! owner drains it while interrupt handlers or other threads post into it.
//! A single compare-and-swap decides who wins, so there is no queueing and
//! no merging.

use super::error::PostError;
use crate::core::Event;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct EventSlot {
    pending: AtomicU8,
    posted: AtomicU32,
    dropped: AtomicU32,
}

impl EventSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `event` if the slot is empty; otherwise drop it.
    pub fn post(&self, event: Event) -> Result<(), PostError> {
        match self.pending.compare_exchange(
            Event::NONE_CODE,
            event.code(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.posted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(held) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(PostError::SlotOccupied {
                    rejected: event,
                    pending: Event::from_code(held),
                })
            }
        }
    }

    /// Validate a raw code before posting it.
    pub fn post_raw(&self, code: u8) -> Result<(), PostError> {
        let event = Event::from_code(code).ok_or(PostError::InvalidEvent { code })?;
        self.post(event)
    }

    /// Event waiting for the next tick, if any.
    pub fn peek(&self) -> Option<Event> {
        Event::from_code(self.pending.load(Ordering::Acquire))
    }

    pub fn is_occupied(&self) -> bool {
        self.peek().is_some()
    }

    /// Empty the slot, returning what it held.
    pub(crate) fn take(&self) -> Option<Event> {
        Event::from_code(self.pending.swap(Event::NONE_CODE, Ordering::AcqRel))
    }

    pub fn posted_count(&self) -> u32 {
        self.posted.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_counters(&self) {
        self.posted.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }
}

/// Cloneable, `Send` handle for posting from another thread or an
/// interrupt context.
#[derive(Debug, Clone)]
pub struct EventPoster {
    slot: Arc<EventSlot>,
}

impl EventPoster {
    pub(crate) fn new(slot: Arc<EventSlot>) -> Self {
        Self { slot }
    }

    pub fn post(&self, event: Event) -> Result<(), PostError> {
        self.slot.post(event)
    }

    pub fn post_raw(&self, code: u8) -> Result<(), PostError> {
        self.slot.post_raw(code)
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_occupied()
    }
}
