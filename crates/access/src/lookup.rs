//! Existence checks shared by the services.

use gatekeeper_core::error::msg;
use gatekeeper_core::{
    Agent, AgentName, DomainError, DomainResult, Email, Group, GroupName, User,
};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::{AgentStore, GroupRegistry, UserDirectory};

pub(crate) async fn user(store: &dyn AccessStore, email: &Email) -> DomainResult<User> {
    store
        .get_user_by_email(email.as_str())
        .await?
        .ok_or_else(|| DomainError::not_found(msg::USER_NOT_EXIST))
}

pub(crate) async fn group(store: &dyn AccessStore, name: &GroupName) -> DomainResult<Group> {
    store
        .get_group(name.as_str())
        .await?
        .ok_or_else(|| DomainError::not_found(msg::GROUP_NOT_EXIST))
}

pub(crate) async fn agent(store: &dyn AccessStore, name: &AgentName) -> DomainResult<Agent> {
    store
        .get_agent(name.as_str())
        .await?
        .ok_or_else(|| DomainError::not_found(msg::AGENT_NOT_EXIST))
}
