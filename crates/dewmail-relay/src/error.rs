//! Error types for relay dispatch operations.
//!
//! Covers outbound HTTP failures and the datastore counter round trip.
//! Forward and datastore pushes are best-effort and never produce these
//! errors; only client construction and the counter read do.

use dewmail_core::CoreError;
use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error types for outbound relay calls.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Routing or verification failure from the core layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    Network {
        /// Error message describing the network failure
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Invalid client or target configuration.
    #[error("invalid relay configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// Mail counter could not be read or parsed from the datastore.
    #[error("failed to get count of mails sent: {message}")]
    CounterUnavailable {
        /// What went wrong reading or parsing the counter
        message: String,
    },
}

impl RelayError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a counter error.
    pub fn counter(message: impl Into<String>) -> Self {
        Self::CounterUnavailable { message: message.into() }
    }
}
