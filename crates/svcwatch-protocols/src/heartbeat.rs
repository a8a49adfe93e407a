//! Heartbeat records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::Metadata;

/// A timestamped liveness signal. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub service_key: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Heartbeat {
    pub fn new(service_key: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            service_key: service_key.into(),
            timestamp,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}
