use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::app::dto;

pub fn router() -> Router {
    Router::new().route("/ping", get(ping))
}

pub async fn ping() -> axum::response::Response {
    (StatusCode::OK, Json(dto::detail("pong"))).into_response()
}
