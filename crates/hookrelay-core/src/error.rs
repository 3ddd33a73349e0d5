//! Shared error types for relay infrastructure.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by core models and external collaborators.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A delivery recorder or other storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A routing strategy string was not one of `first` or `all`.
    #[error("unknown routing strategy: {0}")]
    InvalidRoutingStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        assert_eq!(
            CoreError::Storage("connection lost".into()).to_string(),
            "storage error: connection lost"
        );
        assert_eq!(
            CoreError::InvalidRoutingStrategy("broadcast".into()).to_string(),
            "unknown routing strategy: broadcast"
        );
    }
}
