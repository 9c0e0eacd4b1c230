use std::sync::atomic::{AtomicU32, Ordering};

/// Raised from inside a journey body when the journey was cancelled or timed out
/// while it was blocked waiting for something (§3.2's `disableEvents`/`enableEvents`
/// pair). Cancellation always dominates a timeout that raced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JourneyEvent {
    #[error("journey was cancelled")]
    Cancelled,
    #[error("journey timed out")]
    Timedout,
}

const FLAG_ENTERED: u32 = 1 << 0;
const FLAG_EVENTS_ENABLED: u32 = 1 << 1;
const FLAG_DONE: u32 = 1 << 2;
const FLAG_CANCELLED: u32 = 1 << 3;
const FLAG_TIMEDOUT: u32 = 1 << 4;
const VALUE_COUNTER: u32 = 1 << 5;
const FLAG_MASK: u32 = VALUE_COUNTER - 1;

/// Packed `(flags, counter)` state cell shared by every handle to one journey.
///
/// Same bit layout as the state this is ported from: five single-bit flags in the
/// low bits and a generation counter in the rest. The counter isn't about ABA
/// protection here (we hold the journey behind an `Arc`, so there's no reuse) —
/// it's kept because `acquire`/`release_and_done` below still reason about it the
/// same way the source does, and tests pin the exact flag transitions against it.
#[derive(Debug, Default)]
pub struct JourneyState(AtomicU32);

impl JourneyState {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    fn counter_of(word: u32) -> u32 {
        word >> 5
    }

    pub fn is_entered(&self) -> bool {
        self.0.load(Ordering::Acquire) & FLAG_ENTERED != 0
    }

    pub fn is_events_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire) & FLAG_EVENTS_ENABLED != 0
    }

    pub fn is_done(&self) -> bool {
        self.0.load(Ordering::Acquire) & FLAG_DONE != 0
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) & FLAG_CANCELLED != 0
    }

    pub fn is_timedout(&self) -> bool {
        self.0.load(Ordering::Acquire) & FLAG_TIMEDOUT != 0
    }

    pub fn counter(&self) -> u32 {
        Self::counter_of(self.0.load(Ordering::Acquire))
    }

    /// Marks the journey cancelled. Returns `true` if the caller should wake it
    /// (it was blocked with events enabled and not already entered).
    pub fn cancel(&self) -> bool {
        let old = self.0.fetch_or(FLAG_CANCELLED, Ordering::AcqRel);
        old & FLAG_CANCELLED == 0 && old & FLAG_ENTERED == 0 && old & FLAG_EVENTS_ENABLED != 0
    }

    /// Same contract as [`cancel`](Self::cancel), for a timeout. Cancellation
    /// still wins if both race: the reader sees `is_cancelled()` first.
    pub fn timedout(&self) -> bool {
        let old = self.0.fetch_or(FLAG_TIMEDOUT, Ordering::AcqRel);
        old & (FLAG_TIMEDOUT | FLAG_CANCELLED) == 0
            && old & FLAG_ENTERED == 0
            && old & FLAG_EVENTS_ENABLED != 0
    }

    /// Turns event delivery off and reports whether it was on beforehand — the
    /// caller uses this to decide whether it needs to re-check for a raised event
    /// immediately after (see `handle_events`).
    pub fn disable_events(&self) -> bool {
        let old = self.0.fetch_and(!FLAG_EVENTS_ENABLED, Ordering::AcqRel);
        old & FLAG_EVENTS_ENABLED != 0
    }

    pub fn enable_events(&self) {
        self.0.fetch_or(FLAG_EVENTS_ENABLED, Ordering::AcqRel);
    }

    /// Clears `ENTERED`, and if a cancel/timeout arrived while it was set,
    /// reports the event that should be raised into the journey body.
    pub fn reset_entered_and_check_events(&self) -> Option<JourneyEvent> {
        let old = self.0.fetch_and(!FLAG_ENTERED, Ordering::AcqRel);
        if old & FLAG_CANCELLED != 0 {
            Some(JourneyEvent::Cancelled)
        } else if old & FLAG_TIMEDOUT != 0 {
            Some(JourneyEvent::Timedout)
        } else {
            None
        }
    }

    /// Raises whichever event is currently latched, or `Ok(())` if none.
    pub fn handle_events(&self) -> Result<(), JourneyEvent> {
        let word = self.0.load(Ordering::Acquire);
        if word & FLAG_CANCELLED != 0 {
            Err(JourneyEvent::Cancelled)
        } else if word & FLAG_TIMEDOUT != 0 {
            Err(JourneyEvent::Timedout)
        } else {
            Ok(())
        }
    }

    pub fn mark_done(&self) {
        self.0.fetch_or(FLAG_DONE, Ordering::AcqRel);
    }

    /// Bumps the generation counter and sets `ENTERED`, returning the new
    /// `(counter, events_enabled)` pair. Resumption is always serialized by the
    /// journey's own poll slot, so the two atomic updates below never race with
    /// another `acquire`.
    pub fn acquire(&self) -> (u32, bool) {
        let bumped = self.0.fetch_add(VALUE_COUNTER, Ordering::AcqRel) + VALUE_COUNTER;
        let old = self.0.fetch_or(FLAG_ENTERED, Ordering::AcqRel);
        (Self::counter_of(bumped), old & FLAG_EVENTS_ENABLED != 0)
    }
}
