//! Request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use svcwatch_monitor::HeartbeatSummary;
use svcwatch_protocols::{Metadata, ServicePatch, ServiceStatus};

/// `POST /heartbeat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub service_key: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// `POST /configure-service`: the key plus any configuration fields to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureServiceRequest {
    pub service_key: String,
    #[serde(flatten)]
    pub patch: ServicePatch,
}

/// `POST /mark-alerted`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAlertedRequest {
    pub service_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAlertedResponse {
    pub status: String,
    pub transitions_marked: u64,
}

/// Heartbeat view of one service in `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusReport {
    pub service: String,
    /// Stored status, when the service is registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    pub last_heartbeat: DateTime<Utc>,
    pub time_since_last_heartbeat_seconds: f64,
    pub time_since_last_heartbeat_readable: String,
    pub median_interval: Option<f64>,
    pub heartbeat_count: usize,
}

impl ServiceStatusReport {
    pub fn from_summary(service: String, summary: HeartbeatSummary) -> Self {
        Self {
            time_since_last_heartbeat_readable: format_elapsed(
                summary.time_since_last_heartbeat_seconds,
            ),
            service,
            status: None,
            last_heartbeat: summary.last_heartbeat,
            time_since_last_heartbeat_seconds: summary.time_since_last_heartbeat_seconds,
            median_interval: summary.median_interval,
            heartbeat_count: summary.heartbeat_count,
        }
    }

    pub fn with_status(mut self, status: Option<ServiceStatus>) -> Self {
        self.status = status;
        self
    }
}

/// `GET /status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesStatusResponse {
    pub services: BTreeMap<String, ServiceStatusReport>,
}

/// Render elapsed seconds as the two largest units, e.g. `3d 4h`, `2h 5m`, `45s`.
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
