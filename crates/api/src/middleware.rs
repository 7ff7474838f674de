use std::any::Any;
use std::time::{Duration, Instant};

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self as axum_middleware, Next},
    response::Response,
};
use tower::{ServiceBuilder, timeout::TimeoutLayer, timeout::error::Elapsed};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};
use tracing::{error, info, warn};

use gatekeeper_auth::{Identity, TokenCodec, TokenError};
use gatekeeper_core::{DomainError, error::msg};

use crate::app::errors::{domain_error_to_response, json_error};
use crate::context::RequestId;
use crate::cookie;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport settings for the pipeline.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_origin: HeaderValue,
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub codec: TokenCodec,
}

/// Wrap `router` in the full pipeline, outermost first: access log,
/// panic recovery, CORS, request timeout, token verification.
pub fn apply(router: Router, auth: AuthState, options: &HttpOptions) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(axum_middleware::from_fn(access_log))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(cors(options))
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(options.request_timeout))
            .layer(axum_middleware::from_fn_with_state(auth, verify_token)),
    )
}

pub async fn access_log(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::new();
    req.extensions_mut().insert(request_id);

    let headers = req.headers();
    let user_agent = header_str(headers.get(header::USER_AGENT));
    let real_ip = header_str(
        headers
            .get("x-real-ip")
            .or_else(|| headers.get("x-forwarded-for")),
    );
    let content_length = header_str(headers.get(header::CONTENT_LENGTH));
    info!(
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri(),
        user_agent,
        real_ip,
        content_length,
        "init request"
    );

    let started = Instant::now();
    let mut res = next.run(req).await;
    info!(
        request_id = %request_id,
        status = res.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "end of request"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    res
}

fn header_str(value: Option<&HeaderValue>) -> &str {
    value.and_then(|v| v.to_str().ok()).unwrap_or("")
}

pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "handler panicked");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, msg::INTERNAL)
}

pub async fn handle_timeout(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        warn!("request timed out");
        return json_error(StatusCode::REQUEST_TIMEOUT, msg::REQUEST_TIMEOUT);
    }
    error!(error = %err, "request failed in middleware");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, msg::INTERNAL)
}

fn cors(options: &HttpOptions) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(options.cors_origin.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

/// Requests without a token pass through anonymously.
pub async fn verify_token(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = cookie::read_token(req.headers()) else {
        return next.run(req).await;
    };

    match auth.codec.verify(&token) {
        Ok(username) => {
            req.extensions_mut().insert(Identity::new(username));
            next.run(req).await
        }
        Err(e @ (TokenError::Invalid | TokenError::Expired)) => {
            warn!(error = %e, "token rejected");
            domain_error_to_response(DomainError::unauthenticated(msg::INVALID_TOKEN))
        }
        Err(e) => {
            error!(error = %e, "token could not be decoded");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, msg::INTERNAL)
        }
    }
}
