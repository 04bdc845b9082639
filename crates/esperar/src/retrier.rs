//! Count-Bounded Retry of Side-Effecting Actions
//!
//! Where the poller repeats a pure probe against a deadline, the retrier
//! re-executes an "act, then check" pair a fixed number of times with a
//! fixed inter-attempt delay. It is the right shape when the unit of
//! repetition mutates external state (a click that must produce a
//! verifiable change) and cannot be re-evaluated as a probe.
//!
//! Two deliberately asymmetric variants share the control flow:
//!
//! - [`Retrier::retry`] escalates: on budget exhaustion the final attempt's
//!   error surfaces verbatim. Used where failure must be visible.
//! - [`Retrier::retry_if_false`] degrades: on exhaustion it hands back the
//!   last observed value without raising. Used for best-effort scans where
//!   the caller inspects what was found.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::clock::{Clock, SleepOutcome, SystemClock};

/// Default delay between retry attempts (100ms)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;

/// Error from the raising [`Retrier::retry`] variant
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error> {
    /// Budget exhausted; carries the final attempt's error verbatim
    #[error(transparent)]
    Exhausted(E),

    /// Cancelled during an inter-attempt sleep
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts performed before cancellation
        attempts: usize,
    },
}

impl<E: std::error::Error> RetryError<E> {
    /// The final attempt's error, when the budget was exhausted
    #[must_use]
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted(err) => Some(err),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Count-bounded retrier for act-then-check pairs
///
/// The attempt budget is a hard ceiling: the action never runs more than
/// `attempts` times regardless of elapsed wall-clock time.
#[derive(Debug, Clone)]
pub struct Retrier {
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Retrier {
    /// Create a retrier backed by the real clock
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock::new()),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the clock (inject a [`crate::clock::FakeClock`] in tests)
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the cancellation token
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle callers can use to abort this retrier's sleeps from another
    /// thread
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Retry `action` until it returns `Ok`, up to `attempts` times
    ///
    /// The action receives the zero-based attempt index. The first clean
    /// return wins with no validation of the returned value; an action that
    /// wants its post-condition enforced signals failure through its own
    /// error. A budget below 1 is treated as 1.
    ///
    /// # Errors
    ///
    /// [`RetryError::Exhausted`] carrying the *last* attempt's error once
    /// the budget is spent, or [`RetryError::Cancelled`] if the token fires
    /// during an inter-attempt sleep.
    pub fn retry<T, E, F>(
        &self,
        attempts: usize,
        interval: Duration,
        mut action: F,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error,
        F: FnMut(usize) -> Result<T, E>,
    {
        let budget = attempts.max(1);
        let mut index = 0;
        loop {
            match action(index) {
                Ok(value) => {
                    trace!(attempt = index, "action succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    index += 1;
                    if index >= budget {
                        debug!(attempts = index, error = %err, "retry budget exhausted");
                        return Err(RetryError::Exhausted(err));
                    }
                    trace!(attempt = index, error = %err, "action failed; retrying");
                }
            }
            if self.clock.sleep(interval, &self.cancel) == SleepOutcome::Cancelled {
                debug!(attempts = index, "retry cancelled");
                return Err(RetryError::Cancelled { attempts: index });
            }
        }
    }

    /// Retry `action` until `accept` approves its result, up to `attempts`
    /// times
    ///
    /// Never raises: on budget exhaustion the value from the final attempt
    /// is returned as-is, and the caller inspects it. Cancellation during a
    /// sleep likewise stops further attempts and yields the last observed
    /// value. A budget below 1 is treated as 1.
    pub fn retry_if_false<T, A, F>(
        &self,
        attempts: usize,
        interval: Duration,
        accept: A,
        mut action: F,
    ) -> T
    where
        A: Fn(&T) -> bool,
        F: FnMut(usize) -> T,
    {
        let budget = attempts.max(1);
        let mut index = 0;
        loop {
            let value = action(index);
            if accept(&value) {
                trace!(attempt = index, "result accepted");
                return value;
            }
            index += 1;
            if index >= budget {
                debug!(attempts = index, "budget exhausted; returning last observed value");
                return value;
            }
            if self.clock.sleep(interval, &self.cancel) == SleepOutcome::Cancelled {
                debug!(attempts = index, "cancelled; returning last observed value");
                return value;
            }
        }
    }

    /// Retry an `Option`-returning action until it yields `Some`, up to
    /// `attempts` times
    ///
    /// The "present" fixed form of [`Retrier::retry_if_false`]; on
    /// exhaustion the final `None` comes back and the caller decides what
    /// absence means.
    pub fn retry_until_some<T, F>(
        &self,
        attempts: usize,
        interval: Duration,
        action: F,
    ) -> Option<T>
    where
        F: FnMut(usize) -> Option<T>,
    {
        self.retry_if_false(attempts, interval, Option::is_some, action)
    }
}

// =============================================================================
// TESTS
// =============================================================================
