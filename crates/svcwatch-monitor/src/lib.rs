//! # svcwatch monitor
//!
//! Turns heartbeat history into service status.
//!
//! ## Components
//!
//! - [`StatusEngine`]: pure status inference from configuration or heartbeat cadence
//! - [`TransitionRecorder`]: persists status changes and their alert records
//! - [`ServiceRegistry`]: heartbeat ingestion and service configuration
//! - [`MonitorLoop`]: periodic reconciliation of every service
//! - [`AlertDispatcher`]: delivers unalerted transitions to alert channels

pub mod alert_channels;
pub mod alert_manager;
pub mod alerts;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod monitor_loop;
pub mod recorder;
pub mod registry;
pub mod summary;

pub use alert_channels::{SlackChannel, TelegramChannel};
pub use alert_manager::AlertManager;
pub use alerts::{Alert, AlertChannel, AlertSeverity, LogChannel};
pub use dispatcher::{AlertDispatcher, DispatchReport};
pub use engine::{
    median_interval_secs, Assessment, InferenceStrategy, StatusEngine, GRACE_FACTOR, MIN_SAMPLES,
};
pub use error::MonitorError;
pub use monitor_loop::{MonitorLoop, TickReport};
pub use recorder::{alert_message, TransitionRecorder};
pub use registry::ServiceRegistry;
pub use summary::{summarize_heartbeats, HeartbeatSummary, STATUS_WINDOW_DAYS};
