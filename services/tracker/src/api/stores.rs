//! Store and membership API handlers.
//!
//! # Purpose
//! Creates stores (the creator becomes their owner), lists the caller's
//! stores, and manages who belongs to a store with which role.
//!
//! # Key invariants
//! - A member can only grant roles at or below their own rank.
//! - Every membership change is audited.
use crate::api::error::{
    ApiError, api_conflict, api_forbidden, api_internal, api_validation_error,
};
use crate::api::types::{
    MemberAddRequest, MemberListResponse, StoreCreateRequest, StoreListResponse,
};
use crate::api::{clean_optional, parse_path_id, record_audit, require_store_permission};
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::auth::rbac::{ACTION_MEMBERS_MANAGE, ACTION_STATS_VIEW, role_rank};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use larder_common::ids::StoreId;
use larder_compliance::AuditEvent;
use larder_compliance::model::{Membership, Role, Store};

#[utoipa::path(
    post,
    path = "/v1/stores",
    tag = "stores",
    request_body = StoreCreateRequest,
    responses(
        (status = 201, description = "Store created; the caller is its owner", body = Store),
        (status = 400, description = "Invalid store", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing actor", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_store(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StoreCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(api_validation_error("store name must not be empty"));
    }
    let store = Store {
        id: StoreId::new(),
        name: name.to_string(),
        location: clean_optional(body.location),
    };
    let owner = Membership {
        store_id: store.id,
        user_id: actor.user_id,
        role: Role::Owner,
    };
    let store = match state.store.create_store(store, owner).await {
        Ok(store) => store,
        Err(StoreError::Conflict(_)) => {
            return Err(api_conflict("already_exists", "store already exists"));
        }
        Err(err) => return Err(api_internal("failed to create store", &err)),
    };
    tracing::info!(store_id = %store.id, owner = %actor.user_id, "store created");
    record_audit(
        &state,
        &actor,
        store.id,
        AuditEvent::MemberAdded {
            user_id: actor.user_id,
            role: Role::Owner,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(store)))
}

#[utoipa::path(
    get,
    path = "/v1/stores",
    tag = "stores",
    responses(
        (status = 200, description = "Stores the caller belongs to", body = StoreListResponse)
    )
)]
pub(crate) async fn list_stores(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StoreListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let items = state
        .store
        .list_stores_for_user(actor.user_id)
        .await
        .map_err(|err| api_internal("failed to list stores", &err))?;
    Ok(Json(StoreListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/stores/{store_id}/members",
    tag = "stores",
    params(("store_id" = String, Path, description = "Store identifier")),
    request_body = MemberAddRequest,
    responses(
        (status = 201, description = "Member added", body = Membership),
        (status = 403, description = "Caller cannot grant this role", body = crate::api::types::ErrorResponse),
        (status = 409, description = "User already belongs to the store", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_member(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MemberAddRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    let actor_role =
        require_store_permission(&state, store_id, &actor, ACTION_MEMBERS_MANAGE).await?;
    if role_rank(body.role) > role_rank(actor_role) {
        return Err(api_forbidden("cannot grant a role above your own"));
    }
    let membership = Membership {
        store_id,
        user_id: body.user_id,
        role: body.role,
    };
    let membership = match state.store.add_member(membership).await {
        Ok(membership) => membership,
        Err(StoreError::Conflict(_)) => {
            return Err(api_conflict(
                "already_member",
                "user already belongs to this store",
            ));
        }
        Err(err) => return Err(api_internal("failed to add member", &err)),
    };
    record_audit(
        &state,
        &actor,
        store_id,
        AuditEvent::MemberAdded {
            user_id: membership.user_id,
            role: membership.role,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    get,
    path = "/v1/stores/{store_id}/members",
    tag = "stores",
    params(("store_id" = String, Path, description = "Store identifier")),
    responses(
        (status = 200, description = "Store members", body = MemberListResponse),
        (status = 404, description = "Store not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_members(
    Path(store_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MemberListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let store_id: StoreId = parse_path_id(&store_id, "store_id")?;
    require_store_permission(&state, store_id, &actor, ACTION_STATS_VIEW).await?;
    let items = state
        .store
        .list_members(store_id)
        .await
        .map_err(|err| api_internal("failed to list members", &err))?;
    Ok(Json(MemberListResponse { items }))
}
