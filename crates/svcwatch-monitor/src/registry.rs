//! Service registry: heartbeat ingestion and configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use tracing::{debug, info};

use svcwatch_protocols::{
    validate_configuration, validate_service_key, Heartbeat, Metadata, Service, ServicePatch,
    Store,
};

use crate::error::MonitorError;
use crate::summary::{summarize_heartbeats, HeartbeatSummary, STATUS_WINDOW_DAYS};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

/// Front door for writes that do not come from the monitor loop.
///
/// Keeps a cache of keys known to exist so steady heartbeat traffic skips the
/// registration round-trip.
pub struct ServiceRegistry {
    store: Arc<dyn Store>,
    known: DashSet<String>,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            known: DashSet::new(),
        }
    }

    /// The backing store.
    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Load every registered key into the cache. Returns how many were loaded.
    pub async fn warm(&self) -> Result<usize, MonitorError> {
        let services = self
            .store
            .list_services()
            .await
            .map_err(|e| MonitorError::store("list_services", "*", e))?;
        for service in &services {
            self.known.insert(service.service_key.clone());
        }
        info!("Service registry warmed with {} services", services.len());
        Ok(services.len())
    }

    /// Number of cached keys.
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Create the service with defaults unless it exists. Returns whether it was created.
    pub async fn ensure_registered(
        &self,
        service_key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MonitorError> {
        if self.known.contains(service_key) {
            return Ok(false);
        }

        let inserted = self
            .store
            .insert_service(Service::new(service_key, now))
            .await
            .map_err(|e| MonitorError::store("insert_service", service_key, e))?;
        self.known.insert(service_key.to_string());

        if inserted {
            info!(service_key, "Registered new service");
        }
        Ok(inserted)
    }

    /// Store a heartbeat and refresh the service's `last_seen`.
    pub async fn record_heartbeat(
        &self,
        service_key: &str,
        metadata: Metadata,
        now: DateTime<Utc>,
    ) -> Result<(), MonitorError> {
        validate_service_key(service_key)?;

        self.store
            .append_heartbeat(Heartbeat::new(service_key, now).with_metadata(metadata))
            .await
            .map_err(|e| MonitorError::store("append_heartbeat", service_key, e))?;
        self.ensure_registered(service_key, now).await?;
        self.store
            .touch_service(service_key, now)
            .await
            .map_err(|e| MonitorError::store("touch_service", service_key, e))?;

        debug!(service_key, "Heartbeat recorded");
        Ok(())
    }

    /// Apply a configuration patch, registering the service first if needed.
    pub async fn configure(
        &self,
        service_key: &str,
        patch: &ServicePatch,
        now: DateTime<Utc>,
    ) -> Result<Service, MonitorError> {
        validate_configuration(service_key, patch)?;
        self.ensure_registered(service_key, now).await?;

        if !patch.is_empty() {
            let matched = self
                .store
                .patch_service(service_key, patch)
                .await
                .map_err(|e| MonitorError::store("patch_service", service_key, e))?;
            if !matched {
                return Err(MonitorError::InconsistentState {
                    service_key: service_key.to_string(),
                    reason: "registered service did not match the patch".to_string(),
                });
            }
        }

        let service = self.get(service_key).await?.ok_or_else(|| {
            MonitorError::InconsistentState {
                service_key: service_key.to_string(),
                reason: "service missing after configuration".to_string(),
            }
        })?;
        info!(service_key, "Service configured");
        Ok(service)
    }

    pub async fn get(&self, service_key: &str) -> Result<Option<Service>, MonitorError> {
        self.store
            .get_service(service_key)
            .await
            .map_err(|e| MonitorError::store("get_service", service_key, e))
    }

    pub async fn list(&self) -> Result<Vec<Service>, MonitorError> {
        self.store
            .list_services()
            .await
            .map_err(|e| MonitorError::store("list_services", "*", e))
    }

    /// Heartbeat summaries for every service heard from in the last week.
    pub async fn heartbeat_summaries(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, HeartbeatSummary>, MonitorError> {
        let since = now - Duration::days(STATUS_WINDOW_DAYS);
        let heartbeats = self
            .store
            .heartbeats_since(since)
            .await
            .map_err(|e| MonitorError::store("heartbeats_since", "*", e))?;
        Ok(summarize_heartbeats(&heartbeats, now))
    }
}
