//! Answers "may this user invoke that agent".
//!
//! Reads through the group registry and the grant edges; owns no state.

use std::sync::Arc;

use tracing::{debug, instrument};

use gatekeeper_auth::{EffectivePrivileges, RootIdentity};
use gatekeeper_core::error::msg;
use gatekeeper_core::{Agent, AgentName, DomainError, DomainResult, Email, User};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::{GroupRegistry, PrivilegeStore};

use crate::lookup;

#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl AccessResolver {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    /// Direct grants plus the grants of every group the user is in.
    /// Root gets no implicit bypass.
    #[instrument(skip(self), err)]
    pub async fn can_execute(&self, user_email: &str, agent_name: &str) -> DomainResult<bool> {
        let user_email = Email::parse(user_email)?;
        let agent_name = AgentName::parse(agent_name)?;
        let store = self.store.as_ref();

        let user = lookup::user(store, &user_email).await?;
        let agent = lookup::agent(store, &agent_name).await?;
        let allowed = self.effective(&user).await?.allows(&agent.name);

        debug!(user = %user.email, agent = %agent.name, allowed, "access resolved");
        Ok(allowed)
    }

    /// Effective agents sorted by name; visible to the user themself and root.
    #[instrument(skip(self), err)]
    pub async fn get_user_agents(
        &self,
        user_email: &str,
        asker_email: &str,
    ) -> DomainResult<Vec<Agent>> {
        let user_email = Email::parse(user_email)?;
        let asker_email = Email::parse(asker_email)?;

        let user = lookup::user(self.store.as_ref(), &user_email).await?;
        if user_email != asker_email && !self.root.is_root(&asker_email) {
            return Err(DomainError::forbidden(msg::USER_AGENTS_FORBIDDEN));
        }
        Ok(self.effective(&user).await?.into_agents())
    }

    async fn effective(&self, user: &User) -> DomainResult<EffectivePrivileges> {
        let groups = self.store.list_user_groups(user.id).await?;
        let mut group_grants = Vec::with_capacity(groups.len());
        for group in &groups {
            group_grants.push(self.store.list_group_agents(group.id).await?);
        }
        let direct = self.store.list_user_agents(user.id).await?;
        Ok(EffectivePrivileges::resolve(group_grants, direct))
    }
}
