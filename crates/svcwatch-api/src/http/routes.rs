//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::monitoring;
use crate::state::AppState;

/// Create the main router.
///
/// ## Route Structure
///
/// ```text
/// POST   /heartbeat          - Record a heartbeat
/// GET    /status             - Heartbeat summary per service (last 7 days)
/// GET    /services/{key}     - Service configuration and status
/// POST   /configure-service  - Create or update a service's configuration
/// GET    /state-transitions  - Latest transition per service (query filter)
/// POST   /state-transitions  - Latest transition per service (body filter)
/// POST   /mark-alerted       - Acknowledge a service's transitions
///
/// /health  - Detailed health check
/// /livez   - Liveness probe
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    let registry_routes = Router::new()
        .route("/heartbeat", post(handlers::heartbeat))
        .route("/status", get(handlers::status))
        .route("/services/{service_key}", get(handlers::get_service))
        .route("/configure-service", post(handlers::configure_service))
        .route(
            "/state-transitions",
            get(handlers::query_transitions).post(handlers::search_transitions),
        )
        .route("/mark-alerted", post(handlers::mark_alerted))
        .with_state(state.clone());

    let monitoring_routes = Router::new()
        .route("/health", get(monitoring::health_check))
        .with_state(state);

    // Liveness probe has no state dependency
    let liveness_route = Router::new().route("/livez", get(monitoring::liveness_probe));

    Router::new()
        .merge(registry_routes)
        .merge(monitoring_routes)
        .merge(liveness_route)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
