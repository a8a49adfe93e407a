//! Registry HTTP handlers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use tracing::info;

use svcwatch_protocols::{Service, ServiceStatus, StateTransition, TransitionFilter};

use crate::error::ApiError;
use crate::http::extract::{ApiJson, ApiQuery};
use crate::http::schemas::{
    ConfigureServiceRequest, HeartbeatRequest, MarkAlertedRequest, MarkAlertedResponse,
    ServiceStatusReport, ServicesStatusResponse,
};
use crate::state::AppState;

/// Record a heartbeat.
///
/// POST /heartbeat
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<HeartbeatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .registry
        .record_heartbeat(
            &request.service_key,
            request.metadata.unwrap_or_default(),
            Utc::now(),
        )
        .await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Heartbeat summary of every service heard from in the last week.
///
/// GET /status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ServicesStatusResponse>, ApiError> {
    let summaries = state.registry.heartbeat_summaries(Utc::now()).await?;
    let statuses: HashMap<String, ServiceStatus> = state
        .registry
        .list()
        .await?
        .into_iter()
        .map(|service| (service.service_key, service.status))
        .collect();

    let services = summaries
        .into_iter()
        .map(|(key, summary)| {
            let report = ServiceStatusReport::from_summary(key.clone(), summary)
                .with_status(statuses.get(&key).copied());
            (key, report)
        })
        .collect();
    Ok(Json(ServicesStatusResponse { services }))
}

/// GET /services/{service_key}
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(service_key): Path<String>,
) -> Result<Json<Service>, ApiError> {
    state
        .registry
        .get(&service_key)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(service_key))
}

/// Create or update a service's configuration.
///
/// POST /configure-service
pub async fn configure_service(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ConfigureServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    info!(service_key = %request.service_key, "Configuring service");
    let service = state
        .registry
        .configure(&request.service_key, &request.patch, Utc::now())
        .await?;
    Ok(Json(service))
}

/// GET /state-transitions?service_key=&limit=&only_not_alerted=
///
/// Newest transition per service; `limit` is a per-service scan window.
pub async fn query_transitions(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<TransitionFilter>,
) -> Result<Json<BTreeMap<String, StateTransition>>, ApiError> {
    Ok(Json(state.recorder.latest(&filter).await?))
}

/// POST /state-transitions
pub async fn search_transitions(
    State(state): State<Arc<AppState>>,
    ApiJson(filter): ApiJson<TransitionFilter>,
) -> Result<Json<BTreeMap<String, StateTransition>>, ApiError> {
    Ok(Json(state.recorder.latest(&filter).await?))
}

/// Acknowledge every transition of a service.
///
/// POST /mark-alerted
pub async fn mark_alerted(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<MarkAlertedRequest>,
) -> Result<Json<MarkAlertedResponse>, ApiError> {
    let marked = state.recorder.acknowledge(&request.service_key).await?;
    Ok(Json(MarkAlertedResponse {
        status: "ok".to_string(),
        transitions_marked: marked,
    }))
}
