//! Monotonic Clock Abstraction for Deterministic Tests
//!
//! Poll deadlines are computed against [`Clock::now_ms`] and every
//! inter-attempt wait goes through [`Clock::sleep`], so an engine wired to a
//! [`FakeClock`] exercises its full timing behavior without real sleeps.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// How an inter-attempt sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed
    Completed,
    /// The cancellation token fired before the duration elapsed
    Cancelled,
}

/// Monotonic time source used by the polling and retry loops
pub trait Clock: Debug + Send + Sync {
    /// Milliseconds elapsed on this clock's monotonic timeline
    fn now_ms(&self) -> u64;

    /// Park the calling thread for `duration`, waking early only if `cancel`
    /// fires
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome;
}

/// Real monotonic clock; sleeping parks the thread on the token's condvar
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock anchored at the moment of construction
    #[must_use]
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
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome {
        cancel.wait_timeout(duration)
    }
}

/// Deterministic clock for tests: sleeps advance virtual time instantly
#[derive(Debug, Default)]
pub struct FakeClock {
    current_ms: AtomicU64,
}

impl FakeClock {
    /// Create a fake clock starting at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward without a sleep
    pub fn advance_ms(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome {
        if cancel.is_cancelled() {
            return SleepOutcome::Cancelled;
        }
        self.advance_ms(duration.as_millis() as u64);
        SleepOutcome::Completed
    }
}
