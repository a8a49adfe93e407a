//! HTTP interface module.
//!
//! Provides REST endpoints for:
//! - Heartbeat ingestion
//! - Service status and configuration
//! - Transition queries for alert consumers
//! - Health checks

pub mod extract;
pub mod handlers;
pub mod routes;
pub mod schemas;

pub(crate) mod monitoring;
