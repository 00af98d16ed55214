//! The single-threaded event loop shared by every component in the firmware.
//!
//! Three independent structures make up the loop, matching the original
//! firmware's split (see spec §5 / §9): a FIFO of queued (run-as-soon-as-possible,
//! in order) events, a min-heap of timed events (run no earlier than a given
//! clock tick), and a fixed-size bitset of "fast events" that ISRs can raise
//! without taking a lock. Clock wraparound is handled throughout via signed
//! difference comparisons (`hal_traits::time_after`), never a plain `>`.

use hal_traits::time_after;
use heapless::binary_heap::{BinaryHeap, Min};
use heapless::spsc::Queue;
use heapless::Vec;

/// Maximum number of distinct fast-event bits. Each bit is typically bound
/// to one ISR (a stepper's "step done", an ADC conversion complete, ...).
pub const MAX_FAST_EVENTS: usize = 32;

/// Capacity of the queued-event FIFO.
pub const QUEUED_EVENT_CAPACITY: usize = 16;

/// Capacity of the timed-event heap.
pub const TIMED_EVENT_CAPACITY: usize = 16;

/// An event body. Kept small and `Copy` since events live in fixed-capacity
/// containers with no allocation.
pub type EventId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimedEvent {
    at: u32,
    id: EventId,
}

// `BinaryHeap<_, Min>` orders by `Ord`; we want the earliest `at` on top,
// so `Ord`/`PartialOrd` compare on `at` directly (ties broken by `id` to
// keep a deterministic order, matching the spec's note that equal-time
// events still need a total order).
impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.at.cmp(&other.at).then(self.id.cmp(&other.id))
    }
}
impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The event that should run next, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueEvent {
    Queued(EventId),
    Timed(EventId),
    Fast(u8),
}

/// A plain struct event loop: no executor, no async, just three data
/// structures and a `poll` method the firmware's `main` calls in a loop.
pub struct EventLoop {
    queued: Queue<EventId, { QUEUED_EVENT_CAPACITY + 1 }>,
    timed: BinaryHeap<TimedEvent, Min, TIMED_EVENT_CAPACITY>,
    fast_pending: u32,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub const fn new() -> Self {
        Self { queued: Queue::new(), timed: BinaryHeap::new(), fast_pending: 0 }
    }

    /// Enqueues an event to run as soon as the loop gets to it, after any
    /// events already queued.
    pub fn post_queued(&mut self, id: EventId) -> Result<(), EventId> {
        self.queued.enqueue(id)
    }

    /// Schedules an event to run no earlier than clock tick `at`.
    pub fn post_timed(&mut self, id: EventId, at: u32) -> Result<(), ()> {
        self.timed.push(TimedEvent { at, id }).map_err(|_| ())
    }

    /// Removes a previously scheduled timed event, if it is still pending.
    /// Used for cancellation (e.g. a `WaitTimedOut` watchdog that the wait
    /// it was guarding completed before firing).
    pub fn cancel_timed(&mut self, id: EventId) -> bool {
        if !self.timed.iter().any(|e| e.id == id) {
            return false;
        }
        let remaining: Vec<TimedEvent, TIMED_EVENT_CAPACITY> =
            self.timed.iter().copied().filter(|e| e.id != id).collect();
        self.timed.clear();
        for e in remaining {
            let _ = self.timed.push(e);
        }
        true
    }

    /// Raises a fast event bit. Safe to call from an ISR: it is a single
    /// atomic-equivalent read-modify-write under a `critical_section` at the
    /// call site (the bitset itself has no internal locking, matching the
    /// original design's "ISRs flip bits" note).
    pub fn raise_fast(&mut self, bit: u8) {
        debug_assert!((bit as usize) < MAX_FAST_EVENTS);
        self.fast_pending |= 1 << bit;
    }

    /// Returns and clears the next event due to run, preferring fast events
    /// (lowest latency), then queued events (FIFO order), then the earliest
    /// timed event once its deadline has passed.
    pub fn poll(&mut self, now: u32) -> Option<DueEvent> {
        if self.fast_pending != 0 {
            let bit = self.fast_pending.trailing_zeros() as u8;
            self.fast_pending &= !(1 << bit);
            return Some(DueEvent::Fast(bit));
        }
        if let Some(id) = self.queued.dequeue() {
            return Some(DueEvent::Queued(id));
        }
        if let Some(top) = self.timed.peek() {
            if !time_after(top.at, now) {
                let due = self.timed.pop().unwrap();
                return Some(DueEvent::Timed(due.id));
            }
        }
        None
    }

    pub fn is_idle(&self) -> bool {
        self.fast_pending == 0 && self.queued.is_empty() && self.timed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_events_win_over_queued_and_timed() {
        let mut el = EventLoop::new();
        el.post_queued(1).unwrap();
        el.post_timed(2, 0).unwrap();
        el.raise_fast(3);
        assert_eq!(el.poll(0), Some(DueEvent::Fast(3)));
        assert_eq!(el.poll(0), Some(DueEvent::Queued(1)));
        assert_eq!(el.poll(0), Some(DueEvent::Timed(2)));
        assert_eq!(el.poll(0), None);
    }

    #[test]
    fn timed_events_wait_for_deadline() {
        let mut el = EventLoop::new();
        el.post_timed(1, 100).unwrap();
        assert_eq!(el.poll(50), None);
        assert_eq!(el.poll(100), Some(DueEvent::Timed(1)));
    }

    #[test]
    fn timed_events_survive_clock_wraparound() {
        let mut el = EventLoop::new();
        el.post_timed(1, 10).unwrap();
        assert_eq!(el.poll(u32::MAX), None);
        assert_eq!(el.poll(10), Some(DueEvent::Timed(1)));
    }

    #[test]
    fn cancel_removes_a_pending_timed_event() {
        let mut el = EventLoop::new();
        el.post_timed(1, 100).unwrap();
        el.post_timed(2, 200).unwrap();
        assert!(el.cancel_timed(1));
        assert_eq!(el.poll(1000), Some(DueEvent::Timed(2)));
        assert_eq!(el.poll(1000), None);
    }
}
