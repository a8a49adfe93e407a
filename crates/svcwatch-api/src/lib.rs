//! # svcwatch API
//!
//! HTTP surface of the service registry:
//! - **Ingestion**: `POST /heartbeat`
//! - **Queries**: service status, configuration and transitions
//! - **Alert consumers**: unalerted transitions and acknowledgement
//! - **Probes**: `/livez`, `/health`

pub mod error;
pub mod http;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use http::routes::create_router;
pub use http::schemas::{
    format_elapsed, ConfigureServiceRequest, HeartbeatRequest, MarkAlertedRequest,
    MarkAlertedResponse, ServiceStatusReport, ServicesStatusResponse,
};
pub use server::{ApiServer, ServerAddress};
pub use state::AppState;
