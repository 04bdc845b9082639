//! External Cancellation for In-Flight Waits
//!
//! A polling loop spends most of its life parked in an inter-attempt sleep.
//! `CancelToken` gives the caller a handle that wakes that sleep immediately,
//! so a wait can be aborted from another thread instead of running out its
//! full deadline or attempt budget.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::SleepOutcome;

/// Cloneable cancellation handle shared between a waiting loop and the
/// caller that may abort it.
///
/// Cancellation is one-way and sticky: once [`CancelToken::cancel`] has been
/// called, every current and future sleep on the token reports
/// [`SleepOutcome::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

impl CancelToken {
    /// Create a fresh, unfired token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token, waking any sleep currently parked on it
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.signal.notify_all();
    }

    /// Whether the token has fired
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block the calling thread for up to `duration`, returning early if the
    /// token fires.
    pub(crate) fn wait_timeout(&self, duration: Duration) -> SleepOutcome {
        let deadline = Instant::now() + duration;
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return SleepOutcome::Completed;
            }
            // Condvar waits can wake spuriously; re-check against the deadline
            let (guard, _) = self
                .inner
                .signal
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
        SleepOutcome::Cancelled
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_sticky() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_wait_runs_full_duration_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        let outcome = token.wait_timeout(Duration::from_millis(50));
        assert_eq!(outcome, SleepOutcome::Completed);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_on_fired_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        let outcome = token.wait_timeout(Duration::from_secs(10));
        assert_eq!(outcome, SleepOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_wakes_a_parked_wait() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let outcome = handle.join().expect("waiter thread");
        assert_eq!(outcome, SleepOutcome::Cancelled);
    }
}
