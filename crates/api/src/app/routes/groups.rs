use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, Query},
    routing::{get, post, put},
};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::Identity;

use super::ensure_acting;
use crate::app::{dto, errors::json_result};

pub fn router() -> Router {
    Router::new()
        .route(
            "/groups/:group/add_user/:email/who_invites/:acting",
            post(add_user),
        )
        .route(
            "/groups/:group/kick_user/:email/who_kicks/:acting",
            post(kick_user),
        )
        .route("/groups/:group/who_adds/:acting", post(request_group))
        .route(
            "/groups/:group/users/:email/who_change_owner/:acting",
            put(change_owner),
        )
        .route("/users/:email/groups/who_asks/:asker", get(list_groups))
        .route(
            "/users/:email/groups/:group/who_change_status/:acting",
            put(update_bid_status),
        )
}

pub async fn add_user(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, email, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services.groups.add_user_to_group(&email, &acting, &group).await;
    json_result(result, |group| {
        dto::detail(format!("user {email} was added to group {group}"))
    })
}

pub async fn kick_user(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, email, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services.groups.kick_user_from_group(&email, &acting, &group).await;
    json_result(result, |group| {
        dto::detail(format!("user {email} was removed from group {group}"))
    })
}

pub async fn list_groups(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, asker)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &asker).await {
        return res;
    }
    json_result(services.groups.get_user_groups(&email, &asker).await, |groups| {
        dto::groups_to_json(&groups)
    })
}

pub async fn request_group(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, acting)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services.bids.make_request_to_create_group(&acting, &group).await;
    json_result(result, |bid| dto::bid_to_json(&bid))
}

pub async fn update_bid_status(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, group, acting)): Path<(String, String, String)>,
    Query(query): Query<dto::StatusQuery>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let status = query.status.unwrap_or_default();
    let result = services
        .bids
        .update_request_status(&email, &group, &acting, &status)
        .await;
    json_result(result, |bid| dto::bid_to_json(&bid))
}

pub async fn change_owner(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, email, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    json_result(services.groups.change_owner(&email, &group, &acting).await, |group| {
        dto::group_to_json(&group)
    })
}
