//! State transitions and the atomic status change that carries them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::ServiceStatus;

/// Default number of transitions scanned by a query.
pub const DEFAULT_TRANSITION_LIMIT: usize = 100;

/// A recorded change from one status to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub id: String,
    pub service_key: String,
    pub from_state: ServiceStatus,
    pub to_state: ServiceStatus,
    pub timestamp: DateTime<Utc>,
    /// Set once an alert consumer acknowledged the transition. Never reset.
    #[serde(default)]
    pub alerted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

impl StateTransition {
    pub fn new(
        service_key: impl Into<String>,
        from_state: ServiceStatus,
        to_state: ServiceStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service_key: service_key.into(),
            from_state,
            to_state,
            timestamp,
            alerted: false,
            alert_message: None,
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.alert_message = message;
        self
    }
}

/// Filter for transition queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,

    /// Maximum number of transitions returned, newest first. `latest` applies it per service.
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub only_not_alerted: bool,
}

fn default_limit() -> usize {
    DEFAULT_TRANSITION_LIMIT
}

impl Default for TransitionFilter {
    fn default() -> Self {
        Self {
            service_key: None,
            limit: default_limit(),
            only_not_alerted: false,
        }
    }
}

impl TransitionFilter {
    pub fn for_service(service_key: impl Into<String>) -> Self {
        Self {
            service_key: Some(service_key.into()),
            ..Default::default()
        }
    }

    pub fn not_alerted() -> Self {
        Self {
            only_not_alerted: true,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a transition passes the key and alert filters.
    pub fn matches(&self, transition: &StateTransition) -> bool {
        if let Some(key) = &self.service_key {
            if &transition.service_key != key {
                return false;
            }
        }
        !(self.only_not_alerted && transition.alerted)
    }
}

/// A confirmed status change, applied by the store as one atomic write.
///
/// Status, `updated_at` and the optional transition record land together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub service_key: String,
    pub status: ServiceStatus,
    pub updated_at: DateTime<Utc>,
    pub transition: Option<StateTransition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transition_not_alerted() {
        let t = StateTransition::new("api", ServiceStatus::Alive, ServiceStatus::Down, Utc::now());
        assert!(!t.alerted);
        assert!(t.alert_message.is_none());
        assert_eq!(t.id.len(), 36);
    }

    #[test]
    fn test_filter_defaults_from_empty_json() {
        let filter: TransitionFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, TransitionFilter::default());
        assert_eq!(filter.limit, 100);
        assert!(!filter.only_not_alerted);
    }

    #[test]
    fn test_filter_matches() {
        let mut t = StateTransition::new("api", ServiceStatus::Alive, ServiceStatus::Dead, Utc::now());

        assert!(TransitionFilter::default().matches(&t));
        assert!(TransitionFilter::for_service("api").matches(&t));
        assert!(!TransitionFilter::for_service("worker").matches(&t));
        assert!(TransitionFilter::not_alerted().matches(&t));

        t.alerted = true;
        assert!(!TransitionFilter::not_alerted().matches(&t));
        assert!(TransitionFilter::default().matches(&t));
    }

    #[test]
    fn test_transition_serialization() {
        let t = StateTransition::new("api", ServiceStatus::Down, ServiceStatus::Alive, Utc::now())
            .with_message(Some("api is back online!".to_string()));
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["from_state"], "down");
        assert_eq!(json["to_state"], "alive");
        assert_eq!(json["alerted"], false);
        assert_eq!(json["alert_message"], "api is back online!");
    }
}
