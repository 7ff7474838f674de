//! Effective privileges: one level of group inheritance, no wildcards.
//!
//! A user may invoke an agent when it is granted to them directly or to any
//! group they participate in. Pure set logic; callers gather the grants.

use std::collections::BTreeMap;

use gatekeeper_core::Agent;

/// Deduplicated union of a user's direct and inherited grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePrivileges {
    agents: BTreeMap<String, Agent>,
}

impl EffectivePrivileges {
    pub fn resolve<G>(group_grants: G, direct_grants: Vec<Agent>) -> Self
    where
        G: IntoIterator<Item = Vec<Agent>>,
    {
        let agents = group_grants
            .into_iter()
            .flatten()
            .chain(direct_grants)
            .map(|agent| (agent.name.clone(), agent))
            .collect();
        Self { agents }
    }

    pub fn allows(&self, agent_name: &str) -> bool {
        self.agents.contains_key(agent_name)
    }

    /// Agents sorted by name.
    pub fn into_agents(self) -> Vec<Agent> {
        self.agents.into_values().collect()
    }
}
