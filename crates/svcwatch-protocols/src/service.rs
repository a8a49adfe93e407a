//! Service configuration and current status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{validate_service_key, ValidationError};

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// Metadata map type.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Absolute ceiling after which a silent service is dead: 7 days.
pub const DEAD_CEILING_SECS: u64 = 7 * 24 * 3600;

/// `dead_after` defaults to this multiple of `expected_period`.
pub const DEFAULT_DEAD_MULTIPLIER: u64 = 7;

/// Group assigned to services that do not name one.
pub const DEFAULT_SERVICE_GROUP: &str = "default";

/// Inferred health of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Not enough data to decide.
    Unknown,
    /// Reporting within the expected cadence.
    Alive,
    /// Missed its grace window.
    Down,
    /// Silent for longer than the dead threshold.
    Dead,
}

impl ServiceStatus {
    /// Lowercase name used on the wire and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Alive => "alive",
            ServiceStatus::Down => "down",
            ServiceStatus::Dead => "dead",
        }
    }

    /// Parse the lowercase store representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unknown" => Some(ServiceStatus::Unknown),
            "alive" => Some(ServiceStatus::Alive),
            "down" => Some(ServiceStatus::Down),
            "dead" => Some(ServiceStatus::Dead),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of service being monitored. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Long-running cloud service.
    CloudService,
    /// Periodic local job that may disappear for a while.
    LocalJob,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::CloudService => "cloud_service",
            ServiceType::LocalJob => "local_job",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cloud_service" => Some(ServiceType::CloudService),
            "local_job" => Some(ServiceType::LocalJob),
            _ => None,
        }
    }
}

/// A registered service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique, immutable identity.
    pub service_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default = "default_group")]
    pub service_group: String,

    /// Expected seconds between heartbeats. Switches inference to configured thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_period: Option<u64>,

    /// Seconds of silence after which the service is dead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_after: Option<u64>,

    pub status: ServiceStatus,

    #[serde(default = "default_alerts_enabled")]
    pub alerts_enabled: bool,

    /// Time of the last status change.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Time of the latest heartbeat. Written by ingestion only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: Metadata,
}

fn default_group() -> String {
    DEFAULT_SERVICE_GROUP.to_string()
}

fn default_alerts_enabled() -> bool {
    true
}

impl Service {
    /// A freshly registered service: alive, alerting, in the default group.
    pub fn new(service_key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            service_key: service_key.into(),
            service_type: None,
            display_name: None,
            service_group: default_group(),
            expected_period: None,
            dead_after: None,
            status: ServiceStatus::Alive,
            alerts_enabled: true,
            updated_at: Some(now),
            last_seen: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_expected_period(mut self, secs: u64) -> Self {
        self.expected_period = Some(secs);
        self
    }

    pub fn with_dead_after(mut self, secs: u64) -> Self {
        self.dead_after = Some(secs);
        self
    }

    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_alerts_enabled(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    /// Seconds of silence after which the service counts as dead.
    ///
    /// Explicit `dead_after` wins, then `7 × expected_period`, then the 7-day ceiling.
    pub fn dead_after_secs(&self) -> u64 {
        match (self.dead_after, self.expected_period) {
            (Some(dead_after), _) => dead_after,
            (None, Some(period)) => period.saturating_mul(DEFAULT_DEAD_MULTIPLIER),
            (None, None) => DEAD_CEILING_SECS,
        }
    }

    /// Name shown to humans.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.service_key)
    }
}

/// Partial update of a service's configuration.
///
/// `None` leaves the field unchanged. Status and `updated_at` are not patchable;
/// only the monitor loop writes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_period: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_after: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ServicePatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == ServicePatch::default()
    }

    /// Reject values that cannot drive inference.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.expected_period == Some(0) {
            return Err(ValidationError::InvalidField {
                field: "expected_period".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.dead_after == Some(0) {
            return Err(ValidationError::InvalidField {
                field: "dead_after".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(group) = &self.service_group {
            if group.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "service_group".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply the provided fields to `service`.
    pub fn apply(&self, service: &mut Service) {
        if let Some(service_type) = self.service_type {
            service.service_type = Some(service_type);
        }
        if let Some(period) = self.expected_period {
            service.expected_period = Some(period);
        }
        if let Some(dead_after) = self.dead_after {
            service.dead_after = Some(dead_after);
        }
        if let Some(enabled) = self.alerts_enabled {
            service.alerts_enabled = enabled;
        }
        if let Some(name) = &self.display_name {
            service.display_name = Some(name.clone());
        }
        if let Some(group) = &self.service_group {
            service.service_group = group.clone();
        }
        if let Some(metadata) = &self.metadata {
            service.metadata = metadata.clone();
        }
    }
}

/// Validate a key and patch together, as a configuration request does.
pub fn validate_configuration(key: &str, patch: &ServicePatch) -> Result<(), ValidationError> {
    validate_service_key(key)?;
    patch.validate()
}
