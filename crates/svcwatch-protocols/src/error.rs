//! Error types for the svcwatch protocol layer.

use std::time::Duration;

use thiserror::Error;

/// Maximum accepted length of a service key.
pub const MAX_SERVICE_KEY_LEN: usize = 256;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured deadline.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A query or write failed.
    #[error("Query error: {0}")]
    Query(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A request or patch that does not describe a valid service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service_key must not be empty")]
    EmptyServiceKey,

    #[error("service_key exceeds {max} characters (got {len})")]
    ServiceKeyTooLong { len: usize, max: usize },

    #[error("Invalid value for {field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Check that a service key is usable as a store identity.
pub fn validate_service_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::EmptyServiceKey);
    }
    let len = key.chars().count();
    if len > MAX_SERVICE_KEY_LEN {
        return Err(ValidationError::ServiceKeyTooLong {
            len,
            max: MAX_SERVICE_KEY_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        let display = err.to_string();
        assert!(display.contains("timed out"));
        assert!(display.contains("250ms"));
    }

    #[test]
    fn test_unavailable_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_validate_service_key() {
        assert!(validate_service_key("nightly-backup").is_ok());
        assert_eq!(
            validate_service_key("   "),
            Err(ValidationError::EmptyServiceKey)
        );
        assert_eq!(validate_service_key(""), Err(ValidationError::EmptyServiceKey));
    }

    #[test]
    fn test_validate_service_key_too_long() {
        let key = "x".repeat(MAX_SERVICE_KEY_LEN + 1);
        let err = validate_service_key(&key).unwrap_err();
        assert!(err.to_string().contains("257"));
    }
}
