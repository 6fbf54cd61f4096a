//! Tracker HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the shared helpers every store-scoped
//! handler runs first: membership lookup, permission check, and the
//! best-effort audit write.
pub mod actions;
pub mod audit;
pub mod equipment;
pub mod error;
pub mod notifications;
pub mod openapi;
pub mod records;
pub mod stores;
pub mod system;
pub mod temperatures;
pub mod types;

use crate::api::error::{
    ApiError, api_forbidden, api_internal, api_not_found, api_validation_error,
};
use crate::app::AppState;
use crate::auth::actor::Actor;
use crate::store::StoreError;
use chrono::NaiveDate;
use larder_common::ids::StoreId;
use larder_compliance::model::Role;
use larder_compliance::{AuditEntry, AuditEvent, ComplianceStore};
use std::collections::HashMap;
use std::str::FromStr;

/// Resolve the actor's role at `store_id` and check it grants `action`.
///
/// Unknown stores are 404; stores the actor does not belong to are 403.
pub(crate) async fn require_store_permission(
    state: &AppState,
    store_id: StoreId,
    actor: &Actor,
    action: &str,
) -> Result<Role, ApiError> {
    let role = state
        .store
        .member_role(store_id, actor.user_id)
        .await
        .map_err(|err| api_internal("failed to load membership", &err))?;
    let Some(role) = role else {
        return match state.store.get_store(store_id).await {
            Ok(_) => Err(api_forbidden("not a member of this store")),
            Err(StoreError::NotFound(_)) => Err(api_not_found("store not found")),
            Err(err) => Err(api_internal("failed to load store", &err)),
        };
    };
    if !state.authorizer.allows(role, action) {
        return Err(api_forbidden(&format!("missing permission {action}")));
    }
    Ok(role)
}

/// Permission check for a resource addressed by its own id (equipment, a
/// record, an action) whose store was read from the resource itself.
///
/// A non-member gets the same 404 as for an id that does not exist, so ids of
/// other stores cannot be probed for existence.
pub(crate) async fn require_resource_permission(
    state: &AppState,
    store_id: StoreId,
    actor: &Actor,
    action: &str,
    not_found: &str,
) -> Result<Role, ApiError> {
    let role = state
        .store
        .member_role(store_id, actor.user_id)
        .await
        .map_err(|err| api_internal("failed to load membership", &err))?
        .ok_or_else(|| api_not_found(not_found))?;
    if !state.authorizer.allows(role, action) {
        return Err(api_forbidden(&format!("missing permission {action}")));
    }
    Ok(role)
}

/// Append an audit entry without failing the request that produced it.
pub(crate) async fn record_audit(
    state: &AppState,
    actor: &Actor,
    store_id: StoreId,
    event: AuditEvent,
) {
    let entry = AuditEntry::new(actor.user_id, store_id, event, state.evaluator.now());
    let action = entry.action().as_str();
    if let Err(err) = state.store.append_audit(entry).await {
        tracing::warn!(error = ?err, action, %store_id, "failed to write audit entry");
        metrics::counter!("larder_audit_failures_total").increment(1);
    }
}

/// Parse the optional `day` query parameter (`YYYY-MM-DD`).
pub(crate) fn day_param(params: &HashMap<String, String>) -> Result<Option<NaiveDate>, ApiError> {
    params
        .get("day")
        .map(|value| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| api_validation_error("day must be formatted as YYYY-MM-DD"))
        })
        .transpose()
}

/// Parse a UUID path segment into a typed id.
pub(crate) fn parse_path_id<T: FromStr>(raw: &str, name: &str) -> Result<T, ApiError> {
    raw.parse::<T>()
        .map_err(|_| api_validation_error(&format!("{name} must be a UUID")))
}

/// Trim an optional free-text field, dropping it when empty.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
