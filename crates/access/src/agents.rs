//! The agent catalogue, managed by root.

use std::sync::Arc;

use tracing::{info, instrument};

use gatekeeper_auth::RootIdentity;
use gatekeeper_core::error::msg;
use gatekeeper_core::{Agent, AgentName, DomainError, DomainResult, Email};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::AgentStore;

use crate::lookup;

#[derive(Clone)]
pub struct AgentService {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl AgentService {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    fn ensure_root(&self, acting_email: &str) -> DomainResult<()> {
        if self.root.is_root(&Email::parse(acting_email)?) {
            Ok(())
        } else {
            Err(DomainError::forbidden(msg::NOT_ROOT))
        }
    }

    #[instrument(skip(self), err)]
    pub async fn create_agent(&self, acting_email: &str, agent_name: &str) -> DomainResult<Agent> {
        let agent_name = AgentName::parse(agent_name)?;
        self.ensure_root(acting_email)?;
        if self.store.get_agent(agent_name.as_str()).await?.is_some() {
            return Err(DomainError::conflict(msg::AGENT_EXIST));
        }
        let agent = self.store.create_agent(agent_name.as_str()).await?;
        info!(agent = %agent.name, "agent created");
        Ok(agent)
    }

    /// Delete an agent together with all of its grants.
    #[instrument(skip(self), err)]
    pub async fn delete_agent(&self, acting_email: &str, agent_name: &str) -> DomainResult<()> {
        let agent_name = AgentName::parse(agent_name)?;
        self.ensure_root(acting_email)?;
        let agent = lookup::agent(self.store.as_ref(), &agent_name).await?;
        self.store.delete_agent(agent.id).await?;
        info!(agent = %agent.name, "agent deleted");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn list_agents(&self, acting_email: &str) -> DomainResult<Vec<Agent>> {
        self.ensure_root(acting_email)?;
        Ok(self.store.list_agents().await?)
    }
}
