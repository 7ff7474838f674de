//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage backend, root bootstrap and token codec
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: domain errors to status codes

use axum::{Extension, Router, http::StatusCode};

use gatekeeper_core::error::msg;

use crate::middleware::{self, AuthState, HttpOptions};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppState, StartupError, build_state, http_options, state_with_store};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState, options: &HttpOptions) -> Router {
    let auth = AuthState {
        codec: state.codec.clone(),
    };

    let router = Router::new()
        .nest("/api/v1", routes::router())
        .fallback(route_not_found)
        .layer(Extension(state.services))
        .layer(Extension(state.codec));

    middleware::apply(router, auth, options)
}

async fn route_not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, msg::ROUTE_NOT_FOUND)
}
