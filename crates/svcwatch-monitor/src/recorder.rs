//! Status persistence and transition records.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use svcwatch_protocols::{Service, ServiceStatus, StateTransition, StatusChange, Store, TransitionFilter};

use crate::error::MonitorError;

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;

/// Compose the alert text for a change to `to`.
///
/// Recovery gets a "back online" line, down and dead name the last sighting,
/// and unknown gets nothing.
pub fn alert_message(service: &Service, to: ServiceStatus) -> Option<String> {
    match to {
        ServiceStatus::Alive => Some(format!("{} is back online!", service.service_key)),
        ServiceStatus::Down | ServiceStatus::Dead => {
            let last_seen = service
                .last_seen
                .or(service.updated_at)
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "never".to_string());
            Some(format!(
                "{} is {}. Last seen: {}",
                service.service_key, to, last_seen
            ))
        }
        ServiceStatus::Unknown => None,
    }
}

/// Writes status changes and answers transition queries.
#[derive(Clone)]
pub struct TransitionRecorder {
    store: Arc<dyn Store>,
}

impl TransitionRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist `inferred` if it differs from the stored status.
    ///
    /// Returns the transition written, which is `None` when nothing changed or
    /// the service has alerts disabled.
    pub async fn reconcile(
        &self,
        service: &Service,
        inferred: ServiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<StateTransition>, MonitorError> {
        if inferred == service.status {
            return Ok(None);
        }

        let transition = service.alerts_enabled.then(|| {
            StateTransition::new(&service.service_key, service.status, inferred, now)
                .with_message(alert_message(service, inferred))
        });

        let change = StatusChange {
            service_key: service.service_key.clone(),
            status: inferred,
            updated_at: now,
            transition: transition.clone(),
        };
        let matched = self
            .store
            .commit_status(change)
            .await
            .map_err(|e| MonitorError::store("commit_status", &service.service_key, e))?;
        if !matched {
            return Err(MonitorError::NotFound(service.service_key.clone()));
        }

        if transition.is_some() {
            info!(
                service_key = %service.service_key,
                from = %service.status,
                to = %inferred,
                "Service changed status"
            );
        } else {
            debug!(
                service_key = %service.service_key,
                from = %service.status,
                to = %inferred,
                "Service changed status (alerts disabled)"
            );
        }

        Ok(transition)
    }

    /// Mark every transition of a service as alerted. Returns how many flipped.
    pub async fn acknowledge(&self, service_key: &str) -> Result<u64, MonitorError> {
        let exists = self
            .store
            .get_service(service_key)
            .await
            .map_err(|e| MonitorError::store("get_service", service_key, e))?
            .is_some();
        if !exists {
            return Err(MonitorError::NotFound(service_key.to_string()));
        }

        let marked = self
            .store
            .mark_alerted(service_key)
            .await
            .map_err(|e| MonitorError::store("mark_alerted", service_key, e))?;
        debug!(service_key, marked, "Transitions acknowledged");
        Ok(marked)
    }

    /// Most recent transition of each service passing `filter`.
    ///
    /// `filter.limit` bounds the rows scanned per service, so a noisy service
    /// cannot push quieter ones out of the result.
    pub async fn latest(
        &self,
        filter: &TransitionFilter,
    ) -> Result<BTreeMap<String, StateTransition>, MonitorError> {
        let keys = match &filter.service_key {
            Some(key) => vec![key.clone()],
            None => self
                .store
                .list_services()
                .await
                .map_err(|e| MonitorError::store("list_services", "*", e))?
                .into_iter()
                .map(|service| service.service_key)
                .collect(),
        };

        let mut latest = BTreeMap::new();
        for key in keys {
            let scoped = TransitionFilter {
                service_key: Some(key.clone()),
                ..filter.clone()
            };
            let transitions = self
                .store
                .query_transitions(&scoped)
                .await
                .map_err(|e| MonitorError::store("query_transitions", &key, e))?;
            if let Some(newest) = transitions.into_iter().next() {
                latest.insert(key, newest);
            }
        }
        Ok(latest)
    }
}
