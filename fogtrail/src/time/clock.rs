//! Epoch-Millisecond Clock
//!
//! Samples coming from a real sensor carry their own fix time. Samples
//! injected without one are stamped with the current wall-clock time,
//! read through the [`Clock`] trait so tests can pin it.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in Unix epoch milliseconds
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Current system time in epoch milliseconds
    #[inline]
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_millis(&self) -> i64 {
        Self::now()
    }
}

/// Manually advanced clock for deterministic tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock pinned at `millis`
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move the clock to an absolute time
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Advance the clock by `delta` milliseconds
    pub fn advance(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Absolute difference between two epoch-millisecond values.
///
/// Never overflows, even for timestamps at opposite ends of the `i64` range.
#[inline]
pub fn abs_diff_millis(a: i64, b: i64) -> u64 {
    a.abs_diff(b)
}
