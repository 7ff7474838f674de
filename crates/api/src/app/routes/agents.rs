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
            "/agents/:agent/who_creates/:acting",
            post(create_agent),
        )
        .route(
            "/agents/:agent/who_deletes/:acting",
            delete(delete_agent),
        )
        .route("/agents/who_reads/:acting", get(list_agents))
}

pub async fn create_agent(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((agent, acting)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    json_result(services.agents.create_agent(&acting, &agent).await, |agent| {
        dto::agent_to_json(&agent)
    })
}

pub async fn delete_agent(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path((agent, acting)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    json_result(services.agents.delete_agent(&acting, &agent).await, |()| {
        dto::detail(format!("agent {agent} was deleted"))
    })
}

pub async fn list_agents(
    Extension(services): Extension<Arc<AccessServices>>,
    identity: Option<Extension<Identity>>,
    Path(acting): Path<String>,
) -> axum::response::Response {
    if let Err(res) = ensure_acting(&services, &identity, &acting).await {
        return res;
    }
    json_result(services.agents.list_agents(&acting).await, |agents| {
        dto::agents_to_json(&agents)
    })
}
