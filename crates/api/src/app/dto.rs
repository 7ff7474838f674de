use serde::Deserialize;
use serde_json::json;

use gatekeeper_core::{Agent, BidView, Group, User};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub fn detail(message: impl Into<String>) -> serde_json::Value {
    json!({ "detail": message.into() })
}

pub fn user_to_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
    })
}

pub fn group_to_json(group: &Group) -> serde_json::Value {
    json!({
        "id": group.id,
        "name": group.name,
        "owner_id": group.owner_id,
    })
}

pub fn groups_to_json(groups: &[Group]) -> serde_json::Value {
    serde_json::Value::Array(groups.iter().map(group_to_json).collect())
}

pub fn agent_to_json(agent: &Agent) -> serde_json::Value {
    json!({
        "id": agent.id,
        "name": agent.name,
    })
}

pub fn agents_to_json(agents: &[Agent]) -> serde_json::Value {
    serde_json::Value::Array(agents.iter().map(agent_to_json).collect())
}

pub fn bid_to_json(bid: &BidView) -> serde_json::Value {
    json!({
        "id": bid.id,
        "group_name": bid.group_name,
        "owner_id": bid.owner_id,
        "status": bid.status.as_str(),
    })
}

pub fn access_to_json(can_execute: bool) -> serde_json::Value {
    json!({ "can_execute": can_execute })
}
