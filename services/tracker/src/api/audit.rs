//! Audit trail handler.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::AuditListResponse;
use crate::api::{parse_path_id, require_store_permission};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::ACTION_AUDIT_VIEW;
use crate::store::AUDIT_PAGE_LIMIT;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use larder_common::ids::StoreId;
use std::collections::HashMap;

const DEFAULT_AUDIT_LIMIT: usize = 100;

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/audit",
    tag = "audit",
    params(
        ("store_id" = String, Path, description = "Store identifier"),
        ("limit" = Option<usize>, Query, description = "Maximum entries (default 100, capped at 500)")
    ),
    responses(
        (status = 200, description = "Audit entries, newest first", body = AuditListResponse),
        (status = 403, description = "Missing audit.view", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_audit(
    Path(store_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuditListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_AUDIT_VIEW).await?;
    let limit = params
        .get("limit")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, AUDIT_PAGE_LIMIT);
    let items = state
        .store
        .list_audit(store_id, limit)
        .await
        .map_err(|err| api_internal("failed to list audit entries", &err))?;
    Ok(Json(AuditListResponse { items }))
}
