//! API error types and helpers.
//!
//! # Purpose
//! Every handler fails with [`ApiError`], a status code plus a uniform
//! `{ code, message, request_id }` body. Store and evaluator failures are mapped
//! here so the rest of the API never builds an error body by hand.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
//! - Evaluator `OperationFailed` errors surface only their fixed message; the
//!   storage cause was already logged where it happened.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use larder_compliance::ComplianceError;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use tracker::api::error::api_not_found;
///
/// let err = api_not_found("equipment not found");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.code, "not_found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-chosen code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 from a store error. The error is logged; `message` is all the
/// client sees.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "tracker storage error");
    api_internal_message(message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Map an evaluator failure onto the HTTP taxonomy.
pub fn api_compliance(err: ComplianceError) -> ApiError {
    match err {
        ComplianceError::NotFound(message) => api_not_found(&message),
        ComplianceError::Validation(message) => api_validation_error(&message),
        ComplianceError::OperationFailed { message, .. } => api_internal_message(message),
    }
}
