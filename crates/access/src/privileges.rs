//! Grants of agents to groups and to individual users.

use std::sync::Arc;

use tracing::{info, instrument};

use gatekeeper_auth::RootIdentity;
use gatekeeper_core::error::msg;
use gatekeeper_core::{Agent, AgentName, DomainError, DomainResult, Email, GroupName};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::PrivilegeStore;

use crate::lookup;

#[derive(Clone)]
pub struct PrivilegeService {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl PrivilegeService {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    fn ensure_root(&self, acting_email: &Email) -> DomainResult<()> {
        if self.root.is_root(acting_email) {
            Ok(())
        } else {
            Err(DomainError::forbidden(msg::NOT_ROOT))
        }
    }

    #[instrument(skip(self), err)]
    pub async fn add_agent_to_group(
        &self,
        agent_name: &str,
        group_name: &str,
        acting_email: &str,
    ) -> DomainResult<()> {
        let agent_name = AgentName::parse(agent_name)?;
        let group_name = GroupName::parse(group_name)?;
        self.ensure_root(&Email::parse(acting_email)?)?;
        let store = self.store.as_ref();

        let agent = lookup::agent(store, &agent_name).await?;
        let group = lookup::group(store, &group_name).await?;
        if store.is_group_agent(group.id, agent.id).await? {
            return Err(DomainError::conflict(msg::AGENT_ALREADY_IN_GROUP));
        }
        store.grant_to_group(group.id, agent.id).await?;
        info!(agent = %agent.name, group = %group.name, "agent granted to group");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn delete_agent_from_group(
        &self,
        agent_name: &str,
        group_name: &str,
        acting_email: &str,
    ) -> DomainResult<()> {
        let agent_name = AgentName::parse(agent_name)?;
        let group_name = GroupName::parse(group_name)?;
        self.ensure_root(&Email::parse(acting_email)?)?;
        let store = self.store.as_ref();

        let agent = lookup::agent(store, &agent_name).await?;
        let group = lookup::group(store, &group_name).await?;
        if !store.is_group_agent(group.id, agent.id).await? {
            return Err(DomainError::not_found(msg::AGENT_NOT_IN_GROUP));
        }
        store.revoke_from_group(group.id, agent.id).await?;
        info!(agent = %agent.name, group = %group.name, "agent revoked from group");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn add_agent_to_user(
        &self,
        agent_name: &str,
        user_email: &str,
        acting_email: &str,
    ) -> DomainResult<()> {
        let agent_name = AgentName::parse(agent_name)?;
        let user_email = Email::parse(user_email)?;
        self.ensure_root(&Email::parse(acting_email)?)?;
        let store = self.store.as_ref();

        let agent = lookup::agent(store, &agent_name).await?;
        let user = lookup::user(store, &user_email).await?;
        if store.is_user_agent(user.id, agent.id).await? {
            return Err(DomainError::conflict(msg::AGENT_ALREADY_IN_USER));
        }
        store.grant_to_user(user.id, agent.id).await?;
        info!(agent = %agent.name, user = %user.email, "agent granted to user");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn delete_agent_from_user(
        &self,
        agent_name: &str,
        user_email: &str,
        acting_email: &str,
    ) -> DomainResult<()> {
        let agent_name = AgentName::parse(agent_name)?;
        let user_email = Email::parse(user_email)?;
        self.ensure_root(&Email::parse(acting_email)?)?;
        let store = self.store.as_ref();

        let agent = lookup::agent(store, &agent_name).await?;
        let user = lookup::user(store, &user_email).await?;
        if !store.is_user_agent(user.id, agent.id).await? {
            return Err(DomainError::not_found(msg::AGENT_NOT_IN_USER));
        }
        store.revoke_from_user(user.id, agent.id).await?;
        info!(agent = %agent.name, user = %user.email, "agent revoked from user");
        Ok(())
    }

    /// Agents granted to the group; visible to root and the group owner.
    #[instrument(skip(self), err)]
    pub async fn get_group_agents(
        &self,
        group_name: &str,
        asker_email: &str,
    ) -> DomainResult<Vec<Agent>> {
        let group_name = GroupName::parse(group_name)?;
        let asker_email = Email::parse(asker_email)?;
        let store = self.store.as_ref();

        let group = lookup::group(store, &group_name).await?;
        if !self.root.is_root(&asker_email) {
            let asker = lookup::user(store, &asker_email).await?;
            if !group.is_owned_by(asker.id) {
                return Err(DomainError::forbidden(msg::NOT_OWNER));
            }
        }
        Ok(store.list_group_agents(group.id).await?)
    }
}
