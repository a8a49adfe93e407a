//! Alert types and the channel trait.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use svcwatch_protocols::{ServiceStatus, StateTransition};

use crate::error::MonitorError;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl AlertSeverity {
    /// Severity of a change into `status`.
    pub fn for_status(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Dead => AlertSeverity::Critical,
            ServiceStatus::Down => AlertSeverity::Warning,
            ServiceStatus::Alive | ServiceStatus::Unknown => AlertSeverity::Info,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "\u{2705}",
            AlertSeverity::Warning => "\u{26a0}\u{fe0f}",
            AlertSeverity::Critical => "\u{1f6a8}",
        }
    }
}

/// An alert about one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub service_key: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_state: Option<ServiceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_state: Option<ServiceStatus>,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        service_key: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            service_key: service_key.into(),
            title: title.into(),
            message: message.into(),
            severity,
            from_state: None,
            to_state: None,
            timestamp: Utc::now(),
        }
    }

    /// Build the alert for a recorded transition. `None` when it carries no message.
    pub fn from_transition(transition: &StateTransition) -> Option<Self> {
        let message = transition.alert_message.clone()?;
        Some(Self {
            service_key: transition.service_key.clone(),
            title: format!(
                "{}: {} \u{2192} {}",
                transition.service_key, transition.from_state, transition.to_state
            ),
            message,
            severity: AlertSeverity::for_status(transition.to_state),
            from_state: Some(transition.from_state),
            to_state: Some(transition.to_state),
            timestamp: transition.timestamp,
        })
    }

    /// `"alive \u{2192} down"` when the alert came from a transition.
    pub fn change(&self) -> Option<String> {
        match (self.from_state, self.to_state) {
            (Some(from), Some(to)) => Some(format!("{} \u{2192} {}", from.as_str(), to.as_str())),
            _ => None,
        }
    }
}

/// Alert channel trait.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Send an alert.
    async fn send(&self, alert: &Alert) -> Result<(), MonitorError>;
}

/// Writes alerts to the tracing log.
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
        let service_key = alert.service_key.as_str();
        match alert.severity {
            AlertSeverity::Info => info!(service_key, "[ALERT] {}", alert.message),
            AlertSeverity::Warning => warn!(service_key, "[ALERT] {}", alert.message),
            AlertSeverity::Critical => error!(service_key, "[ALERT] {}", alert.message),
        }
        Ok(())
    }
}
