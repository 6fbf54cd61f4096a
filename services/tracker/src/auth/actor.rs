//! Acting-user resolution.
//!
//! # Purpose
//! The tracker sits behind an authenticating gateway that forwards the verified
//! user id in `x-larder-user`. This module only parses that header; it never
//! authenticates anyone itself.
use crate::api::error::{ApiError, api_unauthorized};
use axum::http::HeaderMap;
use larder_common::ids::UserId;
use std::str::FromStr;

pub const ACTOR_HEADER: &str = "x-larder-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .ok_or_else(|| api_unauthorized("missing x-larder-user header"))?;
    let raw = raw
        .to_str()
        .map_err(|_| api_unauthorized("invalid x-larder-user header"))?;
    let user_id =
        UserId::from_str(raw).map_err(|_| api_unauthorized("invalid x-larder-user header"))?;
    Ok(Actor { user_id })
}
