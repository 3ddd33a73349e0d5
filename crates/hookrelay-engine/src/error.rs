//! Error types for relay operations.
//!
//! Per-destination delivery failures are not errors: they are captured into
//! `DeliveryOutcome` values and never abort sibling attempts or the fallback
//! chain. The variants here cover caller contract violations and internal
//! faults only, which do abort the relay call.

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that abort a relay invocation.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Malformed destination or envelope data, a caller contract violation.
    /// Detected before any delivery attempt is issued.
    #[error("invalid relay configuration: {message}")]
    Configuration {
        /// Description of the contract violation.
        message: String,
    },

    /// Unexpected internal failure, e.g. a fan-out task panicked.
    #[error("internal relay error: {message}")]
    Internal {
        /// Internal error message.
        message: String,
    },
}

impl RelayError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        let error = RelayError::configuration("invalid destination URL");
        assert_eq!(error.to_string(), "invalid relay configuration: invalid destination URL");

        let error = RelayError::internal("task panicked");
        assert_eq!(error.to_string(), "internal relay error: task panicked");
    }
}
