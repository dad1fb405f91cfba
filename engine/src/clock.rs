//! Wall-clock abstraction and per-note timestamp ordering.
//!
//! Merge decisions compare `updatedAt` values, so every local mutation must
//! move a note's timestamp strictly forward even when the system clock stalls
//! or steps backwards.

use crate::Timestamp;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and benchmarks that need reproducible timestamps.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: Timestamp) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `delta` milliseconds and return the new time.
    pub fn advance(&self, delta: Timestamp) -> Timestamp {
        self.millis.fetch_add(delta, Ordering::SeqCst) + delta
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Timestamp for the next local mutation of a note last updated at `previous`.
///
/// Never returns a value at or below `previous`.
pub fn next_update(previous: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match previous {
        Some(prev) => now.max(prev.saturating_add(1)),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen_until_moved() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        assert_eq!(clock.now(), 1_000);

        assert_eq!(clock.advance(250), 1_250);
        assert_eq!(clock.now(), 1_250);

        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800_000);
    }

    #[test]
    fn next_update_for_new_note_is_now() {
        assert_eq!(next_update(None, 5_000), 5_000);
    }

    #[test]
    fn next_update_moves_forward() {
        assert_eq!(next_update(Some(1_000), 2_000), 2_000);
    }

    #[test]
    fn next_update_survives_same_millisecond() {
        assert_eq!(next_update(Some(2_000), 2_000), 2_001);
    }

    #[test]
    fn next_update_survives_clock_stepping_back() {
        assert_eq!(next_update(Some(9_000), 3_000), 9_001);
    }
}
