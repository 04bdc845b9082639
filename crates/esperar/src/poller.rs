//! Time-Bounded Condition Polling
//!
//! Repeatedly evaluates a probe against a wall-clock deadline, absorbing
//! transient probe failures, until a success rule accepts the result or the
//! deadline expires. This is what makes eventually-consistent external state
//! (a rendering page, a downloading file, a DOM mutation) usable from
//! synchronous, assertion-style test code: one evaluation of such state is
//! unreliable, a bounded loop of them is not.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::clock::{Clock, SleepOutcome, SystemClock};
use crate::result::{EsperarError, EsperarResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for poll operations (30 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
///
/// Balances responsiveness against probe cost; each probe may itself be a
/// round trip to an external engine.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Smallest effective timeout; a zero budget is raised to this
pub const MIN_TIMEOUT_MS: u64 = 1_000;

// =============================================================================
// POLL OPTIONS
// =============================================================================

/// Options for poll operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollOptions {
    /// Create new poll options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Timeout with the zero-budget floor applied
    pub(crate) const fn effective_timeout_ms(&self) -> u64 {
        if self.timeout_ms == 0 {
            MIN_TIMEOUT_MS
        } else {
            self.timeout_ms
        }
    }

    /// Poll interval floor-clamped to 1ms; a zero interval could never
    /// advance a virtual clock
    pub(crate) const fn effective_poll_interval(&self) -> Duration {
        if self.poll_interval_ms == 0 {
            Duration::from_millis(1)
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }
}

// =============================================================================
// POLL OUTCOME
// =============================================================================

/// Outcome of one poll invocation
///
/// Success and timeout are mutually exclusive: a result only ever carries a
/// value through `Success` or the explicit `DefaultReturned` substitution,
/// never through a timed-out loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// A probe result satisfied the success rule before the deadline
    Success(T),
    /// The deadline expired and the caller-supplied default was substituted
    DefaultReturned(T),
    /// The deadline expired with no success and no default
    TimedOut {
        /// Probe invocations performed
        attempts: usize,
        /// Message of the last probe error, if any probe raised
        last_error: Option<String>,
    },
}

impl<T> PollOutcome<T> {
    /// Whether a probe result satisfied the success rule
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the deadline expired without success
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The carried value, whether from success or default substitution
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(value) | Self::DefaultReturned(value) => Some(value),
            Self::TimedOut { .. } => None,
        }
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Time-bounded condition poller
///
/// Stateless and reentrant: every poll call carries its own loop state on
/// the calling thread's stack, so one poller can back any number of
/// sequential waits.
#[derive(Debug, Clone)]
pub struct Poller {
    options: PollOptions,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    /// Create a poller with default options and the real clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(PollOptions::default())
    }

    /// Create a poller with custom options
    #[must_use]
    pub fn with_options(options: PollOptions) -> Self {
        Self {
            options,
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

    /// Get the current options
    #[must_use]
    pub const fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Handle callers can use to abort this poller's waits from another
    /// thread
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Poll until the probe yields a present value
    ///
    /// `None` keeps polling; probe errors are absorbed and recorded. On
    /// deadline expiry the failure carries `label` and the last probe
    /// error's message.
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] when the deadline expires,
    /// [`EsperarError::Cancelled`] when the token fires during a sleep.
    pub fn poll<T, E, F>(&self, label: &str, probe: F) -> EsperarResult<T>
    where
        E: Display,
        F: FnMut() -> Result<Option<T>, E>,
    {
        let outcome = self.run(label, None, |_| true, probe)?;
        self.resolve(label, outcome)
    }

    /// Poll until the probe yields a present value, substituting `default`
    /// on deadline expiry instead of failing
    ///
    /// # Errors
    ///
    /// [`EsperarError::Cancelled`] when the token fires during a sleep;
    /// never times out.
    pub fn poll_or<T, E, F>(&self, label: &str, default: T, probe: F) -> EsperarResult<T>
    where
        E: Display,
        F: FnMut() -> Result<Option<T>, E>,
    {
        let outcome = self.run(label, Some(default), |_| true, probe)?;
        self.resolve(label, outcome)
    }

    /// Poll until the probe yields a value the `accept` predicate approves
    ///
    /// The success rule is a first-class value here: rejected results are
    /// dropped and polling continues, exactly like a `None` in [`Poller::poll`].
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] when the deadline expires,
    /// [`EsperarError::Cancelled`] when the token fires during a sleep.
    pub fn poll_with<T, E, A, F>(&self, label: &str, accept: A, mut probe: F) -> EsperarResult<T>
    where
        E: Display,
        A: Fn(&T) -> bool,
        F: FnMut() -> Result<T, E>,
    {
        let outcome = self.run(label, None, accept, move || probe().map(Some))?;
        self.resolve(label, outcome)
    }

    /// Poll a boolean probe until it yields `true`
    ///
    /// `false` is a valid, present value and still keeps polling.
    ///
    /// # Errors
    ///
    /// [`EsperarError::Timeout`] when the deadline expires,
    /// [`EsperarError::Cancelled`] when the token fires during a sleep.
    pub fn poll_until<E, F>(&self, label: &str, probe: F) -> EsperarResult<bool>
    where
        E: Display,
        F: FnMut() -> Result<bool, E>,
    {
        self.poll_with(label, |ready: &bool| *ready, probe)
    }

    /// Lower-level entry returning the tagged [`PollOutcome`]
    ///
    /// # Errors
    ///
    /// Only [`EsperarError::Cancelled`]; deadline expiry is reported through
    /// the outcome, not an error.
    pub fn poll_outcome<T, E, F>(
        &self,
        label: &str,
        default: Option<T>,
        probe: F,
    ) -> EsperarResult<PollOutcome<T>>
    where
        E: Display,
        F: FnMut() -> Result<Option<T>, E>,
    {
        self.run(label, default, |_| true, probe)
    }

    /// The polling loop shared by every public entry point.
    ///
    /// The deadline is computed once on entry and never extended. The probe
    /// always runs before the deadline check, so even a zero budget performs
    /// at least one attempt.
    fn run<T, E, A, F>(
        &self,
        label: &str,
        default: Option<T>,
        accept: A,
        mut probe: F,
    ) -> EsperarResult<PollOutcome<T>>
    where
        E: Display,
        A: Fn(&T) -> bool,
        F: FnMut() -> Result<Option<T>, E>,
    {
        let timeout_ms = self.options.effective_timeout_ms();
        let interval = self.options.effective_poll_interval();
        let deadline = self.clock.now_ms().saturating_add(timeout_ms);
        let mut attempts = 0usize;
        let mut last_error: Option<String> = None;

        loop {
            attempts += 1;
            match probe() {
                Ok(Some(value)) if accept(&value) => {
                    trace!(label, attempts, "condition satisfied");
                    return Ok(PollOutcome::Success(value));
                }
                Ok(_) => {}
                Err(err) => {
                    trace!(label, attempts, error = %err, "probe raised; continuing");
                    last_error = Some(err.to_string());
                }
            }

            if self.clock.now_ms() >= deadline {
                return Ok(match default {
                    Some(value) => {
                        debug!(label, attempts, "deadline reached; substituting default");
                        PollOutcome::DefaultReturned(value)
                    }
                    None => {
                        debug!(label, attempts, last_error = ?last_error, "deadline reached");
                        PollOutcome::TimedOut {
                            attempts,
                            last_error,
                        }
                    }
                });
            }

            if self.clock.sleep(interval, &self.cancel) == SleepOutcome::Cancelled {
                debug!(label, attempts, "wait cancelled");
                return Err(EsperarError::Cancelled {
                    label: label.to_string(),
                    attempts,
                });
            }
        }
    }

    fn resolve<T>(&self, label: &str, outcome: PollOutcome<T>) -> EsperarResult<T> {
        match outcome {
            PollOutcome::Success(value) | PollOutcome::DefaultReturned(value) => Ok(value),
            PollOutcome::TimedOut {
                attempts,
                last_error,
            } => Err(EsperarError::Timeout {
                label: label.to_string(),
                timeout_ms: self.options.effective_timeout_ms(),
                attempts,
                last_error,
            }),
        }
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Wait for a predicate with default options
///
/// # Errors
///
/// Returns a timeout failure if the predicate never returns `true`.
pub fn wait_until<F>(predicate: F, timeout_ms: u64) -> EsperarResult<()>
where
    F: Fn() -> bool,
{
    let poller = Poller::with_options(PollOptions::new().with_timeout(timeout_ms));
    poller.poll_until("wait_until", move || {
        Ok::<bool, std::convert::Infallible>(predicate())
    })?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
