//! # svcwatch Protocols
//!
//! Data model and store protocol definitions shared by every svcwatch crate.
//! Contains only types and interface definitions - no storage implementations.
//!
//! ## Core Traits
//!
//! - [`HeartbeatLog`] - Append-only heartbeat history
//! - [`ServiceStore`] - Current configuration and status of each service
//! - [`TransitionLog`] - Recorded status changes and their alert flags
//! - [`Store`] - Everything above, implemented by every backend

pub mod error;
pub mod heartbeat;
pub mod service;
pub mod store;
pub mod transition;

pub use error::{validate_service_key, StoreError, ValidationError, MAX_SERVICE_KEY_LEN};
pub use heartbeat::Heartbeat;
pub use service::{
    validate_configuration, Metadata, Service, ServicePatch, ServiceStatus, ServiceType,
    DEAD_CEILING_SECS, DEFAULT_DEAD_MULTIPLIER, DEFAULT_SERVICE_GROUP,
};
pub use store::{HeartbeatLog, ServiceStore, Store, TransitionLog};
pub use transition::{StateTransition, StatusChange, TransitionFilter, DEFAULT_TRANSITION_LIMIT};
