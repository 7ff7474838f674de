use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use tracing::{error, info};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::TokenCodec;
use gatekeeper_core::{DomainError, error::msg};

use crate::app::{dto, errors};
use crate::cookie;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/signout", post(sign_out))
}

pub async fn sign_up(
    Extension(services): Extension<Arc<AccessServices>>,
    Extension(codec): Extension<TokenCodec>,
    payload: Result<Json<dto::SignUpRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(Json(body)) = payload else {
        return errors::json_error(StatusCode::BAD_REQUEST, msg::INVALID_DATA);
    };

    let user = match services.users.sign_up(&body.email, &body.username).await {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let now = Utc::now();
    let token = match codec.issue_at(&user.username, now) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "failed to issue token");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, msg::INTERNAL);
        }
    };
    let set_cookie = cookie::session_cookie(&token, now + codec.ttl());

    (
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie)],
        Json(dto::user_to_json(&user)),
    )
        .into_response()
}

pub async fn sign_out(headers: HeaderMap) -> axum::response::Response {
    if cookie::read_token(&headers).is_none() {
        return errors::domain_error_to_response(DomainError::unauthenticated(msg::MISSING_TOKEN));
    }
    info!("session cleared");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie::cleared_cookie())],
        Json(dto::detail("ok")),
    )
        .into_response()
}
