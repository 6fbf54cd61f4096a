//! Compliance record API handlers.
//!
//! # Purpose
//! Lists the records opened by non-compliant readings and lets management close
//! them out as `COMPLIANT` (false alarm) or `CORRECTED` (fixed).
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_not_found, api_validation_error,
};
use crate::api::types::{ComplianceRecordListResponse, ReviewRequest};
use crate::api::{
    parse_path_id, record_audit, require_resource_permission, require_store_permission,
};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::{ACTION_RECORDS_REVIEW, ACTION_STATS_VIEW};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use larder_common::ids::{ComplianceRecordId, StoreId};
use larder_compliance::AuditEvent;
use larder_compliance::model::{ComplianceRecord, RecordStatus};

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/compliance-records",
    tag = "compliance",
    params(("store_id" = String, Path, description = "Store identifier")),
    responses(
        (status = 200, description = "Compliance records, newest first", body = ComplianceRecordListResponse)
    )
)]
pub(crate) async fn list_compliance_records(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ComplianceRecordListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let items = state
        .store
        .list_compliance_records(store_id)
        .await
        .map_err(|err| api_internal("failed to list compliance records", &err))?;
    Ok(Json(ComplianceRecordListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/compliance-records/{record_id}/review",
    tag = "compliance",
    params(("record_id" = String, Path, description = "Compliance record identifier")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Record reviewed", body = ComplianceRecord),
        (status = 400, description = "Unsupported target status", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Record already reviewed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn review_compliance_record(
    Path(record_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<ComplianceRecord>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let record_id: ComplianceRecordId = parse_path_id(&record_id, "record_id")?;
    if body.status == RecordStatus::NonCompliant {
        return Err(api_validation_error(
            "status must be COMPLIANT or CORRECTED",
        ));
    }
    let record = match state.store.get_compliance_record(record_id).await {
        Ok(record) => record,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("compliance record not found")),
        Err(err) => return Err(api_internal("failed to load compliance record", &err)),
    };
    require_resource_permission(
        &state,
        record.store_id,
        &actor,
        ACTION_RECORDS_REVIEW,
        "compliance record not found",
    )
    .await?;

    let reviewed = match state
        .store
        .review_compliance_record(record_id, body.status, actor.user_id, state.evaluator.now())
        .await
    {
        Ok(reviewed) => reviewed,
        Err(StoreError::Conflict(_)) => {
            return Err(api_conflict(
                "invalid_transition",
                "compliance record has already been reviewed",
            ));
        }
        Err(StoreError::NotFound(_)) => return Err(api_not_found("compliance record not found")),
        Err(err) => return Err(api_internal("failed to review compliance record", &err)),
    };
    record_audit(
        &state,
        &actor,
        reviewed.store_id,
        AuditEvent::ComplianceRecordReviewed {
            record_id,
            from: record.status,
            to: reviewed.status,
        },
    )
    .await;
    Ok(Json(reviewed))
}
