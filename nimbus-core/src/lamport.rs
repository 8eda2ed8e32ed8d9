//! Process-wide Lamport clock.
//!
//! The merge rule `max(L, rx) + 1` is not a single atomic RMW, so the
//! counter lives behind a mutex rather than an `AtomicU64`.

use std::sync::{Mutex, PoisonError};

/// HTTP header carrying a peer's Lamport clock.
pub const LAMPORT_CLOCK_HEADER: &str = "X-Lamport-Clock";

#[derive(Debug, Default)]
pub struct LamportClock {
    value: Mutex<u64>,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock for a local event and returns the new value.
    pub fn tick(&self) -> u64 {
        let mut value = self.lock();
        *value += 1;
        *value
    }

    /// Observes a peer clock: `L = max(L, peer) + 1`. Returns the new
    /// value.
    pub fn merge(&self, peer: u64) -> u64 {
        let mut value = self.lock();
        *value = (*value).max(peer) + 1;
        *value
    }

    pub fn current(&self) -> u64 {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        // The guarded state is a plain integer; a poisoned lock cannot
        // leave it in a torn state.
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_increments() {
        let clock = LamportClock::new();
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.current(), 2);
    }

    #[test]
    fn merge_takes_max_plus_one() {
        let clock = LamportClock::new();
        clock.tick();
        assert_eq!(clock.merge(100), 101);
        // A stale peer clock still advances the local one.
        assert_eq!(clock.merge(5), 102);
    }

    #[test]
    fn response_clock_dominates_request_clock() {
        let clock = LamportClock::new();
        let received = clock.merge(42);
        let sent = clock.tick();
        assert!(received > 42);
        assert!(sent > received);
    }
}
