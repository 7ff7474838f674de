use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use gatekeeper_core::{DomainError, DomainResult, error::msg};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(m) | DomainError::NotFound(m) | DomainError::Conflict(m) => {
            json_error(StatusCode::BAD_REQUEST, m)
        }
        DomainError::Forbidden(m) => json_error(StatusCode::FORBIDDEN, m),
        DomainError::Unauthenticated(m) => json_error(StatusCode::UNAUTHORIZED, m),
        DomainError::Internal(m) => {
            error!(error = %m, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, msg::INTERNAL)
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// 200 with `render(value)` on success, the mapped error otherwise.
pub fn json_result<T>(
    result: DomainResult<T>,
    render: impl FnOnce(T) -> serde_json::Value,
) -> axum::response::Response {
    match result {
        Ok(value) => (StatusCode::OK, axum::Json(render(value))).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}
