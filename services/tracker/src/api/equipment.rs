//! Equipment API handlers.
//!
//! # Purpose
//! Registers monitored equipment with an optional acceptable range, lists a
//! store's equipment, and soft-deactivates equipment that is retired.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::types::{EquipmentCreateRequest, EquipmentListResponse};
use crate::api::{
    clean_optional, parse_path_id, record_audit, require_resource_permission,
    require_store_permission,
};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::{ACTION_EQUIPMENT_MANAGE, ACTION_STATS_VIEW};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use larder_common::ids::{EquipmentId, StoreId};
use larder_compliance::model::Equipment;
use larder_compliance::{AuditEvent, EquipmentReader, TemperatureRange};

fn validate_bounds(min: Option<f64>, max: Option<f64>) -> Result<(), ApiError> {
    if min.is_some_and(|value| !value.is_finite()) || max.is_some_and(|value| !value.is_finite())
    {
        return Err(api_validation_error("temperature bounds must be finite"));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(api_validation_error(
                "min_temp must not be greater than max_temp",
            ));
        }
    }
    // A lone bound is paired with the default for the other side; reject pairs
    // no reading could ever satisfy.
    let effective = TemperatureRange::from_bounds(min, max);
    if effective.min > effective.max {
        return Err(api_validation_error(
            "set both min_temp and max_temp for ranges outside the default 0°C – 100°C band",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/stores/{store_id}/equipment",
    tag = "equipment",
    params(("store_id" = String, Path, description = "Store identifier")),
    request_body = EquipmentCreateRequest,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid equipment", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Missing equipment.manage", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_equipment(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EquipmentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_EQUIPMENT_MANAGE).await?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(api_validation_error("equipment name must not be empty"));
    }
    validate_bounds(body.min_temp, body.max_temp)?;
    let equipment = Equipment {
        id: EquipmentId::new(),
        store_id,
        name: name.to_string(),
        category: body.category,
        min_temp: body.min_temp,
        max_temp: body.max_temp,
        location: clean_optional(body.location),
        active: true,
        created_at: state.evaluator.now(),
    };
    if equipment.is_unmonitored() {
        tracing::warn!(
            equipment = %equipment.name,
            %store_id,
            "equipment registered without a temperature range"
        );
    }
    let equipment = state
        .store
        .create_equipment(equipment)
        .await
        .map_err(|err| api_internal("failed to create equipment", &err))?;
    record_audit(
        &state,
        &actor,
        store_id,
        AuditEvent::EquipmentCreated {
            equipment_id: equipment.id,
            name: equipment.name.clone(),
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(equipment)))
}

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/equipment",
    tag = "equipment",
    params(("store_id" = String, Path, description = "Store identifier")),
    responses(
        (status = 200, description = "Store equipment, active and inactive", body = EquipmentListResponse)
    )
)]
pub(crate) async fn list_equipment(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EquipmentListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let items = state
        .store
        .list_equipment(store_id)
        .await
        .map_err(|err| api_internal("failed to list equipment", &err))?;
    Ok(Json(EquipmentListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/equipment/{equipment_id}/deactivate",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment identifier")),
    responses(
        (status = 200, description = "Equipment deactivated", body = Equipment),
        (status = 404, description = "Equipment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn deactivate_equipment(
    Path(equipment_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Equipment>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let equipment_id: EquipmentId = parse_path_id(&equipment_id, "equipment_id")?;
    let lookup = state
        .store
        .find_equipment(equipment_id)
        .await
        .map_err(|err| api_internal("failed to load equipment", &err))?
        .ok_or_else(|| api_not_found("equipment not found"))?;
    let store_id = lookup.equipment.store_id;
    require_resource_permission(
        &state,
        store_id,
        &actor,
        ACTION_EQUIPMENT_MANAGE,
        "equipment not found",
    )
    .await?;
    if !lookup.equipment.active {
        return Ok(Json(lookup.equipment));
    }

    let equipment = match state.store.deactivate_equipment(equipment_id).await {
        Ok(equipment) => equipment,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("equipment not found")),
        Err(err) => return Err(api_internal("failed to deactivate equipment", &err)),
    };
    record_audit(
        &state,
        &actor,
        store_id,
        AuditEvent::EquipmentDeactivated { equipment_id },
    )
    .await;
    Ok(Json(equipment))
}
