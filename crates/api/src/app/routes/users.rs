use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::Path,
    routing::{delete, get},
};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::Identity;

use super::ensure_acting;
use crate::app::{dto, errors::json_result};

pub fn router() -> Router {
    Router::new()
        .route("/users/:email", get(read_user))
        .route("/users/:email/who_deletes/:deleting", delete(delete_user))
}

pub async fn read_user(
    Extension(services): Extension<Arc<AccessServices>>,
    Path(email): Path<String>,
) -> axum::response::Response {
    json_result(services.users.read_user(&email).await, |user| {
        dto::user_to_json(&user)
    })
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, deleting)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &deleting).await {
        return res;
    }
    json_result(services.users.delete_user(&email, &deleting).await, |()| {
        dto::detail("user was successfully deleted")
    })
}
