use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::Path,
    routing::{delete, get, post},
};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::Identity;

use super::ensure_acting;
use crate::app::{dto, errors::json_result};

pub fn router() -> Router {
    Router::new()
        .route(
            "/groups/:group/priveleges/new/agents/:agent/who_adds/:acting",
            post(grant_group),
        )
        .route(
            "/groups/:group/priveleges/delete/agents/:agent/who_deletes/:acting",
            delete(revoke_group),
        )
        .route("/groups/:group/priveleges/who_asks/:asker", get(group_agents))
        .route(
            "/users/:email/priveleges/new/agents/:agent/who_adds/:acting",
            post(grant_user),
        )
        .route(
            "/users/:email/priveleges/delete/agents/:agent/who_deletes/:acting",
            delete(revoke_user),
        )
        .route("/users/:email/priveleges/who_asks/:asker", get(user_agents))
        .route("/users/:email/check_access/agents/:agent", get(check_access))
}

pub async fn grant_group(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, agent, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services.privileges.add_agent_to_group(&agent, &group, &acting).await;
    json_result(result, |()| {
        dto::detail(format!("agent {agent} was added to group {group}"))
    })
}

pub async fn revoke_group(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, agent, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services
        .privileges
        .delete_agent_from_group(&agent, &group, &acting)
        .await;
    json_result(result, |()| {
        dto::detail(format!("agent {agent} was removed from group {group}"))
    })
}

pub async fn group_agents(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((group, asker)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &asker).await {
        return res;
    }
    json_result(services.privileges.get_group_agents(&group, &asker).await, |agents| {
        dto::agents_to_json(&agents)
    })
}

pub async fn grant_user(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, agent, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services.privileges.add_agent_to_user(&agent, &email, &acting).await;
    json_result(result, |()| {
        dto::detail(format!("agent {agent} was added to user {email}"))
    })
}

pub async fn revoke_user(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, agent, acting)): Path<(String, String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    let result = services
        .privileges
        .delete_agent_from_user(&agent, &email, &acting)
        .await;
    json_result(result, |()| {
        dto::detail(format!("agent {agent} was removed from user {email}"))
    })
}

pub async fn user_agents(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((email, asker)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &asker).await {
        return res;
    }
    json_result(services.resolver.get_user_agents(&email, &asker).await, |agents| {
        dto::agents_to_json(&agents)
    })
}

pub async fn check_access(
    Extension(services): Extension<Arc<AccessServices>>,
    Path((email, agent)): Path<(String, String)>,
) -> axum::response::Response {
    json_result(services.resolver.can_execute(&email, &agent).await, dto::access_to_json)
}
