//! System/health API handlers.
//!
//! # Notes
//! Both endpoints are unauthenticated so probes can reach them.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity and capabilities", body = SystemInfo)
    )
)]
pub(crate) async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(SystemInfo {
        api_version: state.api_version.clone(),
        storage_backend: state.store.backend_name().to_string(),
        features: state.features.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Tracker health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and report `ok` when it answers.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(|err| api_internal("storage unavailable", &err))?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
