//! `/api/v1` routes, one file per area.

use axum::{Extension, Router};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::Identity;

use super::errors::domain_error_to_response;
use crate::context;

pub mod agents;
pub mod auth;
pub mod groups;
pub mod privileges;
pub mod system;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(agents::router())
        .merge(groups::router())
        .merge(privileges::router())
}

/// Reject the request when its verified identity is not the acting user.
pub(crate) async fn ensure_acting(
    services: &AccessServices,
    identity: &Option<Extension<Identity>>,
    acting_email: &str,
) -> Result<(), axum::response::Response> {
    services
        .users
        .ensure_acting(context::identity(identity), acting_email)
        .await
        .map_err(domain_error_to_response)
}
