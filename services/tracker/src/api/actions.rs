//! Corrective action API handlers.
//!
//! # Purpose
//! Lists a store's corrective actions with their status as of now (pending
//! actions past due read as `OVERDUE`) and completes them.
//!
//! # Key invariants
//! - Only the assignee or a management role may complete an action.
//! - Overdue is derived on every read; it is never written back.
use crate::api::error::{ApiError, api_conflict, api_forbidden, api_internal, api_not_found};
use crate::api::types::CorrectiveActionListResponse;
use crate::api::{
    parse_path_id, record_audit, require_resource_permission, require_store_permission,
};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::{ACTION_ACTIONS_COMPLETE, ACTION_STATS_VIEW};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use larder_common::ids::{CorrectiveActionId, StoreId};
use larder_compliance::AuditEvent;
use larder_compliance::model::CorrectiveAction;

fn with_effective_status(mut action: CorrectiveAction, now: DateTime<Utc>) -> CorrectiveAction {
    action.status = action.effective_status(now);
    action
}

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/corrective-actions",
    tag = "compliance",
    params(("store_id" = String, Path, description = "Store identifier")),
    responses(
        (status = 200, description = "Corrective actions by due date", body = CorrectiveActionListResponse)
    )
)]
pub(crate) async fn list_corrective_actions(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CorrectiveActionListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let now = state.evaluator.now();
    let items = state
        .store
        .list_corrective_actions(store_id)
        .await
        .map_err(|err| api_internal("failed to list corrective actions", &err))?
        .into_iter()
        .map(|action| with_effective_status(action, now))
        .collect();
    Ok(Json(CorrectiveActionListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/corrective-actions/{action_id}/complete",
    tag = "compliance",
    params(("action_id" = String, Path, description = "Corrective action identifier")),
    responses(
        (status = 200, description = "Action completed", body = CorrectiveAction),
        (status = 403, description = "Caller is neither assignee nor management", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Action not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Action already completed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn complete_corrective_action(
    Path(action_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CorrectiveAction>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let action_id: CorrectiveActionId = parse_path_id(&action_id, "action_id")?;
    let action = match state.store.get_corrective_action(action_id).await {
        Ok(action) => action,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("corrective action not found")),
        Err(err) => return Err(api_internal("failed to load corrective action", &err)),
    };
    let role = require_resource_permission(
        &state,
        action.store_id,
        &actor,
        ACTION_ACTIONS_COMPLETE,
        "corrective action not found",
    )
    .await?;
    if action.assignee != actor.user_id && !role.is_management() {
        return Err(api_forbidden(
            "only the assignee or a manager can complete this action",
        ));
    }

    let now = state.evaluator.now();
    let completed = match state
        .store
        .complete_corrective_action(action_id, actor.user_id, now)
        .await
    {
        Ok(completed) => completed,
        Err(StoreError::Conflict(_)) => {
            return Err(api_conflict(
                "already_completed",
                "corrective action is already completed",
            ));
        }
        Err(StoreError::NotFound(_)) => return Err(api_not_found("corrective action not found")),
        Err(err) => return Err(api_internal("failed to complete corrective action", &err)),
    };
    record_audit(
        &state,
        &actor,
        completed.store_id,
        AuditEvent::CorrectiveActionCompleted {
            action_id,
            record_id: completed.record_id,
        },
    )
    .await;
    Ok(Json(with_effective_status(completed, now)))
}
