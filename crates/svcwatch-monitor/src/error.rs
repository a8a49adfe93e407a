//! Monitor errors.

use svcwatch_protocols::{StoreError, ValidationError};
use thiserror::Error;

/// Monitor error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The request does not describe a valid service.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No service with this key is registered.
    #[error("Service not found: {0}")]
    NotFound(String),

    /// A store call failed.
    #[error("Store {operation} failed for '{service_key}': {source}")]
    Store {
        operation: &'static str,
        service_key: String,
        #[source]
        source: StoreError,
    },

    /// The store answered, but not with what was just written.
    #[error("Inconsistent state for '{service_key}': {reason}")]
    InconsistentState { service_key: String, reason: String },

    /// Alert channel error.
    #[error("Alert error: {0}")]
    Alert(String),
}

impl MonitorError {
    /// Wrap a store failure with the operation and key it hit.
    pub fn store(operation: &'static str, service_key: impl Into<String>, source: StoreError) -> Self {
        MonitorError::Store {
            operation,
            service_key: service_key.into(),
            source,
        }
    }

    /// Whether the failure came from the store.
    pub fn is_store(&self) -> bool {
        matches!(self, MonitorError::Store { .. })
    }
}

impl From<ValidationError> for MonitorError {
    fn from(err: ValidationError) -> Self {
        MonitorError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_error_display() {
        let err = MonitorError::store("commit_status", "api", StoreError::Timeout(Duration::from_secs(5)));
        let text = err.to_string();
        assert!(text.contains("commit_status"));
        assert!(text.contains("'api'"));
        assert!(text.contains("timed out"));
        assert!(err.is_store());
    }

    #[test]
    fn test_from_validation() {
        let err: MonitorError = ValidationError::EmptyServiceKey.into();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert!(!err.is_store());
    }
}
