//! In-memory store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use svcwatch_protocols::{
    Heartbeat, HeartbeatLog, Service, ServicePatch, ServiceStore, StateTransition, StatusChange,
    StoreError, TransitionFilter, TransitionLog,
};

#[derive(Default)]
struct Collections {
    heartbeats: HashMap<String, Vec<Heartbeat>>,
    services: BTreeMap<String, Service>,
    transitions: Vec<StateTransition>,
}

/// Process-local store. All three collections sit behind one lock, so a
/// status change and its transition become visible together.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(heartbeats: &mut [Heartbeat]) {
    heartbeats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[async_trait]
impl HeartbeatLog for MemoryStore {
    async fn append_heartbeat(&self, heartbeat: Heartbeat) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .heartbeats
            .entry(heartbeat.service_key.clone())
            .or_default()
            .push(heartbeat);
        Ok(())
    }

    async fn recent_heartbeats(
        &self,
        service_key: &str,
        limit: usize,
    ) -> Result<Vec<Heartbeat>, StoreError> {
        let inner = self.inner.read().await;
        let mut found = inner
            .heartbeats
            .get(service_key)
            .cloned()
            .unwrap_or_default();
        newest_first(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    async fn heartbeats_since(&self, since: DateTime<Utc>) -> Result<Vec<Heartbeat>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<Heartbeat> = inner
            .heartbeats
            .values()
            .flatten()
            .filter(|hb| hb.timestamp >= since)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn insert_service(&self, service: Service) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.services.contains_key(&service.service_key) {
            return Ok(false);
        }
        inner.services.insert(service.service_key.clone(), service);
        Ok(true)
    }

    async fn get_service(&self, service_key: &str) -> Result<Option<Service>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.services.get(service_key).cloned())
    }

    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.services.values().cloned().collect())
    }

    async fn patch_service(
        &self,
        service_key: &str,
        patch: &ServicePatch,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.services.get_mut(service_key) {
            Some(service) => {
                patch.apply(service);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_service(
        &self,
        service_key: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(service) = inner.services.get_mut(service_key) {
            if service.last_seen.is_none_or(|prev| prev < seen_at) {
                service.last_seen = Some(seen_at);
            }
        }
        Ok(())
    }

    async fn commit_status(&self, change: StatusChange) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(service) = inner.services.get_mut(&change.service_key) else {
            return Ok(false);
        };
        service.status = change.status;
        service.updated_at = Some(change.updated_at);
        if let Some(transition) = change.transition {
            inner.transitions.push(transition);
        }
        Ok(true)
    }
}

#[async_trait]
impl TransitionLog for MemoryStore {
    async fn query_transitions(
        &self,
        filter: &TransitionFilter,
    ) -> Result<Vec<StateTransition>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<StateTransition> = inner
            .transitions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps; reverse for newest first.
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        found.reverse();
        found.truncate(filter.limit);
        Ok(found)
    }

    async fn mark_alerted(&self, service_key: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut changed = 0;
        for transition in inner
            .transitions
            .iter_mut()
            .filter(|t| t.service_key == service_key && !t.alerted)
        {
            transition.alerted = true;
            changed += 1;
        }
        Ok(changed)
    }
}
