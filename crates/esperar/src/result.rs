//! Result and error types for Esperar.

use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors that can occur while waiting on a condition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EsperarError {
    /// The deadline expired with no successful probe and no default
    /// configured
    #[error("wait for '{label}' timed out after {timeout_ms}ms ({attempts} attempt(s)): {}", .last_error.as_deref().unwrap_or("condition never satisfied"))]
    Timeout {
        /// Call-site label for diagnostics
        label: String,
        /// Effective timeout budget in milliseconds
        timeout_ms: u64,
        /// Probe invocations performed before the deadline
        attempts: usize,
        /// Message of the last probe error, if any probe raised
        last_error: Option<String>,
    },

    /// The wait was cancelled through its cancellation token during a sleep
    #[error("wait for '{label}' cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Call-site label for diagnostics
        label: String,
        /// Probe invocations performed before cancellation
        attempts: usize,
    },
}

impl EsperarError {
    /// The call-site label this failure belongs to
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Timeout { label, .. } | Self::Cancelled { label, .. } => label,
        }
    }

    /// Whether this is the cancellation failure, as opposed to an ordinary
    /// timeout
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
