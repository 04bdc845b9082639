//! Esperar: Bounded Condition Polling and Retry for Test Automation
//!
//! Esperar (Spanish: "to wait") is the synchronization core that makes
//! non-deterministic, eventually-consistent external state — a rendering
//! page, a downloading file, a DOM mutation — usable from synchronous,
//! assertion-style test code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     ESPERAR Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐       ┌──────────────┐     ┌────────────┐       │
//! │   │ State      │  pure │ Poller       │     │ Clock +    │       │
//! │   │ queries    │──────►│ (deadline-   │────►│ CancelToken│       │
//! │   │            │ probe │  bounded)    │     │ (cadence + │       │
//! │   └────────────┘       └──────────────┘     │  abort)    │       │
//! │   ┌────────────┐       ┌──────────────┐     │            │       │
//! │   │ Click /    │ act + │ Retrier      │────►│            │       │
//! │   │ download   │──────►│ (count-      │     └────────────┘       │
//! │   │ helpers    │ check │  bounded)    │                          │
//! │   └────────────┘       └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers pick the engine by the shape of the repeated unit: a pure probe
//! goes through [`Poller`], an action with side effects goes through
//! [`Retrier`]. Both run entirely on the calling thread; waiting is a
//! cancellable sleep, never a background task.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// External cancellation for in-flight waits
pub mod cancel;

/// Monotonic clock abstraction with a deterministic test implementation
pub mod clock;

/// Time-bounded condition polling
pub mod poller;

/// Result and error types
pub mod result;

/// Count-bounded retry of side-effecting actions
pub mod retrier;

pub use cancel::CancelToken;
pub use clock::{Clock, FakeClock, SleepOutcome, SystemClock};
pub use poller::{
    wait_until, PollOptions, PollOutcome, Poller, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
    MIN_TIMEOUT_MS,
};
pub use result::{EsperarError, EsperarResult};
pub use retrier::{Retrier, RetryError, DEFAULT_RETRY_INTERVAL_MS};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::cancel::*;
    pub use super::clock::*;
    pub use super::poller::*;
    pub use super::result::*;
    pub use super::retrier::*;
}
