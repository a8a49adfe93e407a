//! Store protocol definitions.
//!
//! The backing store is a key-ordered document store with three collections:
//! `heartbeats`, `services` and `state_transitions`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::heartbeat::Heartbeat;
use crate::service::{Service, ServicePatch};
use crate::transition::{StateTransition, StatusChange, TransitionFilter};

/// Append-only heartbeat history.
#[async_trait]
pub trait HeartbeatLog: Send + Sync {
    /// Append a heartbeat.
    async fn append_heartbeat(&self, heartbeat: Heartbeat) -> Result<(), StoreError>;

    /// Most recent heartbeats of one service, newest first.
    async fn recent_heartbeats(
        &self,
        service_key: &str,
        limit: usize,
    ) -> Result<Vec<Heartbeat>, StoreError>;

    /// Every heartbeat at or after `since`, newest first.
    async fn heartbeats_since(&self, since: DateTime<Utc>) -> Result<Vec<Heartbeat>, StoreError>;
}

/// Current configuration and status of each service.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Insert a service unless the key already exists. Returns whether it was inserted.
    async fn insert_service(&self, service: Service) -> Result<bool, StoreError>;

    /// Load a service by key.
    async fn get_service(&self, service_key: &str) -> Result<Option<Service>, StoreError>;

    /// Load every service, ordered by key.
    async fn list_services(&self) -> Result<Vec<Service>, StoreError>;

    /// Apply a configuration patch. Never touches status or `updated_at`.
    /// Returns whether a service matched.
    async fn patch_service(
        &self,
        service_key: &str,
        patch: &ServicePatch,
    ) -> Result<bool, StoreError>;

    /// Record the latest heartbeat time. Never touches status or `updated_at`.
    async fn touch_service(
        &self,
        service_key: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically write a new status, its `updated_at` and the optional transition.
    /// Returns whether a service matched; nothing is written otherwise.
    async fn commit_status(&self, change: StatusChange) -> Result<bool, StoreError>;
}

/// Recorded transitions and their alert flags.
#[async_trait]
pub trait TransitionLog: Send + Sync {
    /// Transitions passing `filter`, newest first, at most `filter.limit`.
    async fn query_transitions(
        &self,
        filter: &TransitionFilter,
    ) -> Result<Vec<StateTransition>, StoreError>;

    /// Flip `alerted` to true on every transition of a service. Returns how many changed.
    async fn mark_alerted(&self, service_key: &str) -> Result<u64, StoreError>;
}

/// A complete backend.
pub trait Store: HeartbeatLog + ServiceStore + TransitionLog {}

impl<T: HeartbeatLog + ServiceStore + TransitionLog> Store for T {}
