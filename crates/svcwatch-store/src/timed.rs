//! Deadline wrapper for store backends.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use svcwatch_protocols::{
    Heartbeat, HeartbeatLog, Service, ServicePatch, ServiceStore, StateTransition, StatusChange,
    Store, StoreError, TransitionFilter, TransitionLog,
};

/// Bounds every call to the wrapped store by `timeout`.
///
/// An expired call fails with [`StoreError::Timeout`]; the caller sees the
/// same error whether the store hung or was merely slow.
pub struct TimedStore {
    inner: Arc<dyn Store>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "Store call timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl HeartbeatLog for TimedStore {
    async fn append_heartbeat(&self, heartbeat: Heartbeat) -> Result<(), StoreError> {
        self.bounded("append_heartbeat", self.inner.append_heartbeat(heartbeat))
            .await
    }

    async fn recent_heartbeats(
        &self,
        service_key: &str,
        limit: usize,
    ) -> Result<Vec<Heartbeat>, StoreError> {
        self.bounded(
            "recent_heartbeats",
            self.inner.recent_heartbeats(service_key, limit),
        )
        .await
    }

    async fn heartbeats_since(&self, since: DateTime<Utc>) -> Result<Vec<Heartbeat>, StoreError> {
        self.bounded("heartbeats_since", self.inner.heartbeats_since(since))
            .await
    }
}

#[async_trait]
impl ServiceStore for TimedStore {
    async fn insert_service(&self, service: Service) -> Result<bool, StoreError> {
        self.bounded("insert_service", self.inner.insert_service(service))
            .await
    }

    async fn get_service(&self, service_key: &str) -> Result<Option<Service>, StoreError> {
        self.bounded("get_service", self.inner.get_service(service_key))
            .await
    }

    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        self.bounded("list_services", self.inner.list_services()).await
    }

    async fn patch_service(
        &self,
        service_key: &str,
        patch: &ServicePatch,
    ) -> Result<bool, StoreError> {
        self.bounded("patch_service", self.inner.patch_service(service_key, patch))
            .await
    }

    async fn touch_service(
        &self,
        service_key: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.bounded("touch_service", self.inner.touch_service(service_key, seen_at))
            .await
    }

    async fn commit_status(&self, change: StatusChange) -> Result<bool, StoreError> {
        self.bounded("commit_status", self.inner.commit_status(change))
            .await
    }
}

#[async_trait]
impl TransitionLog for TimedStore {
    async fn query_transitions(
        &self,
        filter: &TransitionFilter,
    ) -> Result<Vec<StateTransition>, StoreError> {
        self.bounded("query_transitions", self.inner.query_transitions(filter))
            .await
    }

    async fn mark_alerted(&self, service_key: &str) -> Result<u64, StoreError> {
        self.bounded("mark_alerted", self.inner.mark_alerted(service_key))
            .await
    }
}
