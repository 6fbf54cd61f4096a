//! Temperature reading API handlers.
//!
//! # Purpose
//! Front door to the compliance evaluator: recording a reading (which may open a
//! compliance record, a corrective action, and manager alerts) and the per-day
//! reading list and statistics.
use crate::api::error::{
    ApiError, api_compliance, api_internal, api_not_found, api_validation_error,
};
use crate::api::types::{TemperatureListResponse, TemperatureRecordRequest};
use crate::api::{
    day_param, parse_path_id, require_resource_permission, require_store_permission,
};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::{ACTION_READING_RECORD, ACTION_STATS_VIEW};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use larder_common::ids::{EquipmentId, StoreId};
use larder_compliance::model::TemperatureRecord;
use larder_compliance::{EquipmentReader, RecordTemperature, TemperatureStats, TimeWindow};
use std::collections::HashMap;

#[utoipa::path(
    post,
    path = "/v1/equipment/{equipment_id}/temperatures",
    tag = "temperatures",
    params(("equipment_id" = String, Path, description = "Equipment identifier")),
    request_body = TemperatureRecordRequest,
    responses(
        (status = 201, description = "Reading recorded", body = TemperatureRecord),
        (status = 400, description = "Malformed reading", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Equipment not found", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Reading could not be stored", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn record_temperature(
    Path(equipment_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TemperatureRecordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let equipment_id: EquipmentId = parse_path_id(&equipment_id, "equipment_id")?;
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected temperature payload");
        api_validation_error("temperature must be a number")
    })?;

    // The store to authorize against comes from the equipment itself.
    let lookup = state
        .store
        .find_equipment(equipment_id)
        .await
        .map_err(|err| api_internal("failed to load equipment", &err))?
        .ok_or_else(|| api_not_found("equipment not found"))?;
    require_resource_permission(
        &state,
        lookup.equipment.store_id,
        &actor,
        ACTION_READING_RECORD,
        "equipment not found",
    )
    .await?;

    let reading = state
        .evaluator
        .record_temperature(RecordTemperature {
            equipment_id,
            temperature: body.temperature,
            recorded_by: actor.user_id,
            notes: body.notes,
        })
        .await
        .map_err(api_compliance)?;
    Ok((StatusCode::CREATED, Json(reading)))
}

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/temperatures",
    tag = "temperatures",
    params(
        ("store_id" = String, Path, description = "Store identifier"),
        ("day" = Option<String>, Query, description = "UTC day, YYYY-MM-DD; defaults to today")
    ),
    responses(
        (status = 200, description = "Readings recorded on the day, oldest first", body = TemperatureListResponse)
    )
)]
pub(crate) async fn list_temperatures(
    Path(store_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TemperatureListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    let day = day_param(&params)?.unwrap_or_else(|| state.evaluator.now().date_naive());
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let items = state
        .store
        .list_readings(store_id, TimeWindow::day(day))
        .await
        .map_err(|err| api_internal("failed to list temperatures", &err))?;
    Ok(Json(TemperatureListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/temperature-stats",
    tag = "temperatures",
    params(
        ("store_id" = String, Path, description = "Store identifier"),
        ("day" = Option<String>, Query, description = "UTC day, YYYY-MM-DD; defaults to today")
    ),
    responses(
        (status = 200, description = "Reading counts and compliance rate for the day", body = TemperatureStats)
    )
)]
pub(crate) async fn temperature_stats(
    Path(store_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TemperatureStats>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    let day = day_param(&params)?;
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let stats = state
        .evaluator
        .temperature_stats(store_id, day)
        .await
        .map_err(api_compliance)?;
    Ok(Json(stats))
}
