//! Error types for cache and translation operations
//!
//! Cache-tier errors are soft: callers log them and continue against the
//! origin store. Only serialization problems and provider failures carry
//! information the caller has to act on.

use thiserror::Error;

/// Main error type for the caching layer
#[derive(Error, Debug)]
pub enum CacheError {
    /// Remote store returned an error that is not a connectivity problem
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Remote operation did not complete in time
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    Timeout { timeout_ms: u64, context: String },

    /// Value could not be encoded before storing
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes could not be decoded into the requested type
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Translation provider failure or timeout
    #[error("Translation provider error: {0}")]
    Provider(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether the error comes from the remote tier and can be worked around
    /// by going to the origin store.
    pub fn is_soft(&self) -> bool {
        matches!(self, CacheError::Remote(_) | CacheError::Timeout { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Remote(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::Remote("WRONGTYPE".to_string());
        assert_eq!(error.to_string(), "Remote store error: WRONGTYPE");

        let timeout_error = CacheError::Timeout {
            timeout_ms: 2000,
            context: "GET apod:latest".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 2000ms"));
        assert!(timeout_error.to_string().contains("apod:latest"));
    }

    #[test]
    fn test_soft_classification() {
        assert!(CacheError::Remote("x".to_string()).is_soft());
        assert!(CacheError::Timeout {
            timeout_ms: 1,
            context: "x".to_string()
        }
        .is_soft());
        assert!(!CacheError::Serialization("x".to_string()).is_soft());
        assert!(!CacheError::Deserialization("x".to_string()).is_soft());
        assert!(!CacheError::Provider("x".to_string()).is_soft());
    }
}
