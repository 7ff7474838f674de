//! Seeding of the root user and the default group.

use tracing::info;

use gatekeeper_core::{DEFAULT_GROUP, User};

use crate::store::{
    AccessStore, AgentStore, GroupRegistry, PrivilegeStore, StoreResult, UserDirectory,
};

/// Agent granted to every member of the default group.
pub const DEFAULT_AGENT: &str = "privelege";

/// Ensure the root user, the `users` group owned by root with root as a
/// participant, and the default agent granted to that group. Idempotent.
pub async fn bootstrap_root(
    store: &dyn AccessStore,
    root_email: &str,
    root_username: &str,
) -> StoreResult<User> {
    let root = match store.get_user_by_email(root_email).await? {
        Some(user) => user,
        None => {
            info!(email = root_email, "creating root user");
            store.create_user(root_email, root_username).await?
        }
    };

    let group = match store.get_group(DEFAULT_GROUP).await? {
        Some(group) => group,
        None => {
            info!(group = DEFAULT_GROUP, "creating default group");
            store.create_group(root.id, DEFAULT_GROUP, &[root.id]).await?
        }
    };
    if !store.is_participant(root.id, group.id).await? {
        store.add_member(root.id, group.id).await?;
    }

    let agent = match store.get_agent(DEFAULT_AGENT).await? {
        Some(agent) => agent,
        None => store.create_agent(DEFAULT_AGENT).await?,
    };
    if !store.is_group_agent(group.id, agent.id).await? {
        store.grant_to_group(group.id, agent.id).await?;
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn bootstrap_seeds_root_and_default_group() {
        let store = InMemoryStore::new();
        let root = bootstrap_root(&store, "root@gatekeeper.local", "root").await.unwrap();

        let group = store.get_group(DEFAULT_GROUP).await.unwrap().unwrap();
        assert!(group.is_owned_by(root.id));
        assert!(store.is_participant(root.id, group.id).await.unwrap());

        let agents = store.list_group_agents(group.id).await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, DEFAULT_AGENT);
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let store = InMemoryStore::new();
        let first = bootstrap_root(&store, "root@gatekeeper.local", "root").await.unwrap();
        let second = bootstrap_root(&store, "root@gatekeeper.local", "root").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_agents().await.unwrap().len(), 1);
    }
}
