//! Notification inbox handlers.
//!
//! A user only ever sees their own notifications; marking someone else's reads
//! as not found.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::parse_path_id;
use crate::api::types::NotificationListResponse;
use crate::app::AppState;
use crate::auth::actor::actor_from_headers;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use larder_common::ids::NotificationId;
use larder_compliance::model::Notification;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "notifications",
    params(
        ("unread" = Option<bool>, Query, description = "Only unread notifications")
    ),
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = NotificationListResponse)
    )
)]
pub(crate) async fn list_notifications(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let unread_only = params
        .get("unread")
        .and_then(|value| value.parse::<bool>().ok())
        .unwrap_or(false);
    let items = state
        .store
        .list_notifications(actor.user_id, unread_only)
        .await
        .map_err(|err| api_internal("failed to list notifications", &err))?;
    Ok(Json(NotificationListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{notification_id}/read",
    tag = "notifications",
    params(("notification_id" = String, Path, description = "Notification identifier")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn mark_notification_read(
    Path(notification_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Notification>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let notification_id: NotificationId = parse_path_id(&notification_id, "notification_id")?;
    match state
        .store
        .mark_notification_read(notification_id, actor.user_id)
        .await
    {
        Ok(notification) => Ok(Json(notification)),
        Err(StoreError::NotFound(_)) => Err(api_not_found("notification not found")),
        Err(err) => Err(api_internal("failed to update notification", &err)),
    }
}
