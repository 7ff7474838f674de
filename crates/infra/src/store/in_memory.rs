use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use gatekeeper_core::error::msg;
use gatekeeper_core::{
    Agent, AgentId, Bid, BidId, BidStatus, Group, GroupId, User, UserId,
};

use super::r#trait::{
    AgentStore, BidStore, GroupRegistry, PrivilegeStore, StoreError, StoreResult, UserDirectory,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    groups: HashMap<GroupId, Group>,
    participants: HashSet<(UserId, GroupId)>,
    bids: HashMap<BidId, Bid>,
    agents: HashMap<AgentId, Agent>,
    group_grants: HashSet<(GroupId, AgentId)>,
    user_grants: HashSet<(UserId, AgentId)>,
}

impl State {
    fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.name == name)
    }

    fn pending_bid(&self, group_name: &str) -> Option<&Bid> {
        self.bids
            .values()
            .find(|b| b.group_name == group_name && b.status == BidStatus::InProgress)
    }

    fn groups_of(&self, user_id: UserId) -> HashSet<GroupId> {
        self.participants
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, g)| *g)
            .collect()
    }

    fn groups_sorted(&self, ids: impl IntoIterator<Item = GroupId>) -> Vec<Group> {
        let mut groups: Vec<Group> = ids
            .into_iter()
            .filter_map(|id| self.groups.get(&id).cloned())
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }

    fn agents_sorted(&self, ids: impl IntoIterator<Item = AgentId>) -> Vec<Agent> {
        let mut agents: Vec<Agent> = ids
            .into_iter()
            .filter_map(|id| self.agents.get(&id).cloned())
            .collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    /// Insert a group plus its initial participants; nothing is written on error.
    fn insert_group(
        &mut self,
        owner_id: UserId,
        name: &str,
        members: &[UserId],
    ) -> StoreResult<Group> {
        if self.group_by_name(name).is_some() {
            return Err(StoreError::UniqueViolation(msg::GROUP_EXIST.into()));
        }
        for member in members {
            if !self.users.contains_key(member) {
                return Err(StoreError::NotFound(format!("user {member}")));
            }
        }
        let group = Group {
            id: GroupId::new(),
            name: name.to_owned(),
            owner_id,
        };
        self.groups.insert(group.id, group.clone());
        for member in members {
            self.participants.insert((*member, group.id));
        }
        Ok(group)
    }
}

/// In-memory access store.
///
/// Intended for tests/dev. One lock guards all tables, so every method is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, email: &str, username: &str) -> StoreResult<User> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation(msg::USER_EMAIL_EXIST.into()));
        }
        if state.users.values().any(|u| u.username == username) {
            return Err(StoreError::UniqueViolation(msg::USERNAME_EXIST.into()));
        }
        let user = User {
            id: UserId::new(),
            email: email.to_owned(),
            username: username.to_owned(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.groups.values().any(|g| g.owner_id == user_id) {
            return Err(StoreError::Backend(format!("user {user_id} still owns groups")));
        }
        if state.users.remove(&user_id).is_none() {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        state.participants.retain(|(u, _)| *u != user_id);
        state.user_grants.retain(|(u, _)| *u != user_id);
        state.bids.retain(|_, b| b.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl GroupRegistry for InMemoryStore {
    async fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        Ok(self.read()?.group_by_name(name).cloned())
    }

    async fn create_group(
        &self,
        owner_id: UserId,
        name: &str,
        members: &[UserId],
    ) -> StoreResult<Group> {
        self.write()?.insert_group(owner_id, name, members)
    }

    async fn is_participant(&self, user_id: UserId, group_id: GroupId) -> StoreResult<bool> {
        Ok(self.read()?.participants.contains(&(user_id, group_id)))
    }

    async fn add_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        if !state.groups.contains_key(&group_id) {
            return Err(StoreError::NotFound(format!("group {group_id}")));
        }
        if !state.participants.insert((user_id, group_id)) {
            return Err(StoreError::UniqueViolation(msg::USER_ALREADY_IN_GROUP.into()));
        }
        Ok(())
    }

    async fn remove_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()> {
        self.write()?.participants.remove(&(user_id, group_id));
        Ok(())
    }

    async fn list_user_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let state = self.read()?;
        Ok(state.groups_sorted(state.groups_of(user_id)))
    }

    async fn list_common_groups(&self, a: UserId, b: UserId) -> StoreResult<Vec<Group>> {
        let state = self.read()?;
        let theirs = state.groups_of(b);
        let common = state.groups_of(a).into_iter().filter(|g| theirs.contains(g));
        Ok(state.groups_sorted(common))
    }

    async fn list_owned_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>> {
        let state = self.read()?;
        let owned = state
            .groups
            .values()
            .filter(|g| g.owner_id == user_id)
            .map(|g| g.id);
        Ok(state.groups_sorted(owned.collect::<Vec<_>>()))
    }

    async fn transfer_ownership(&self, group_id: GroupId, new_owner: UserId) -> StoreResult<Group> {
        let mut state = self.write()?;
        if !state.users.contains_key(&new_owner) {
            return Err(StoreError::NotFound(format!("user {new_owner}")));
        }
        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))?;
        group.owner_id = new_owner;
        let group = group.clone();
        state.participants.insert((new_owner, group_id));
        Ok(group)
    }
}

#[async_trait]
impl BidStore for InMemoryStore {
    async fn find_pending_bid(&self, group_name: &str) -> StoreResult<Option<Bid>> {
        Ok(self.read()?.pending_bid(group_name).cloned())
    }

    async fn find_user_pending_bid(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> StoreResult<Option<Bid>> {
        Ok(self
            .read()?
            .pending_bid(group_name)
            .filter(|b| b.user_id == user_id)
            .cloned())
    }

    async fn create_bid(&self, user_id: UserId, group_name: &str) -> StoreResult<Bid> {
        let mut state = self.write()?;
        if state.pending_bid(group_name).is_some() {
            return Err(StoreError::UniqueViolation(msg::BID_EXIST.into()));
        }
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {user_id}")));
        }
        let bid = Bid::open(user_id, group_name);
        state.bids.insert(bid.id, bid.clone());
        Ok(bid)
    }

    async fn reject_bid(&self, bid_id: BidId) -> StoreResult<Bid> {
        let mut state = self.write()?;
        let bid = state
            .bids
            .get_mut(&bid_id)
            .filter(|b| b.status == BidStatus::InProgress)
            .ok_or_else(|| StoreError::NotFound(msg::BID_NOT_EXIST.into()))?;
        bid.status = BidStatus::Rejected;
        Ok(bid.clone())
    }

    async fn approve_bid(&self, bid_id: BidId, members: &[UserId]) -> StoreResult<Group> {
        let mut state = self.write()?;
        let bid = state
            .bids
            .get(&bid_id)
            .filter(|b| b.status == BidStatus::InProgress)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(msg::BID_NOT_EXIST.into()))?;

        let group = state.insert_group(bid.user_id, &bid.group_name, members)?;
        if let Some(stored) = state.bids.get_mut(&bid_id) {
            stored.status = BidStatus::Approved;
        }
        Ok(group)
    }
}

#[async_trait]
impl AgentStore for InMemoryStore {
    async fn get_agent(&self, name: &str) -> StoreResult<Option<Agent>> {
        Ok(self.read()?.agents.values().find(|a| a.name == name).cloned())
    }

    async fn create_agent(&self, name: &str) -> StoreResult<Agent> {
        let mut state = self.write()?;
        if state.agents.values().any(|a| a.name == name) {
            return Err(StoreError::UniqueViolation(msg::AGENT_EXIST.into()));
        }
        let agent = Agent {
            id: AgentId::new(),
            name: name.to_owned(),
        };
        state.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn delete_agent(&self, agent_id: AgentId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.agents.remove(&agent_id).is_none() {
            return Err(StoreError::NotFound(format!("agent {agent_id}")));
        }
        state.group_grants.retain(|(_, a)| *a != agent_id);
        state.user_grants.retain(|(_, a)| *a != agent_id);
        Ok(())
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let state = self.read()?;
        Ok(state.agents_sorted(state.agents.keys().copied().collect::<Vec<_>>()))
    }
}

#[async_trait]
impl PrivilegeStore for InMemoryStore {
    async fn grant_to_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.groups.contains_key(&group_id) || !state.agents.contains_key(&agent_id) {
            return Err(StoreError::NotFound(format!("group {group_id} or agent {agent_id}")));
        }
        if !state.group_grants.insert((group_id, agent_id)) {
            return Err(StoreError::UniqueViolation(msg::AGENT_ALREADY_IN_GROUP.into()));
        }
        Ok(())
    }

    async fn revoke_from_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()> {
        self.write()?.group_grants.remove(&(group_id, agent_id));
        Ok(())
    }

    async fn is_group_agent(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<bool> {
        Ok(self.read()?.group_grants.contains(&(group_id, agent_id)))
    }

    async fn list_group_agents(&self, group_id: GroupId) -> StoreResult<Vec<Agent>> {
        let state = self.read()?;
        let granted: Vec<AgentId> = state
            .group_grants
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, a)| *a)
            .collect();
        Ok(state.agents_sorted(granted))
    }

    async fn grant_to_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user_id) || !state.agents.contains_key(&agent_id) {
            return Err(StoreError::NotFound(format!("user {user_id} or agent {agent_id}")));
        }
        if !state.user_grants.insert((user_id, agent_id)) {
            return Err(StoreError::UniqueViolation(msg::AGENT_ALREADY_IN_USER.into()));
        }
        Ok(())
    }

    async fn revoke_from_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()> {
        self.write()?.user_grants.remove(&(user_id, agent_id));
        Ok(())
    }

    async fn is_user_agent(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<bool> {
        Ok(self.read()?.user_grants.contains(&(user_id, agent_id)))
    }

    async fn list_user_agents(&self, user_id: UserId) -> StoreResult<Vec<Agent>> {
        let state = self.read()?;
        let granted: Vec<AgentId> = state
            .user_grants
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, a)| *a)
            .collect();
        Ok(state.agents_sorted(granted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn group_creation_inserts_members_atomically() {
        let store = InMemoryStore::new();
        let owner = store.create_user("a@x.io", "alice").await.unwrap();
        let ghost = UserId::new();

        let err = store
            .create_group(owner.id, "eng", &[owner.id, ghost])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.get_group("eng").await.unwrap().is_none());

        let group = store.create_group(owner.id, "eng", &[owner.id]).await.unwrap();
        assert!(store.is_participant(owner.id, group.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_rows_are_unique_violations() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@x.io", "alice").await.unwrap();
        assert!(matches!(
            store.create_user("a@x.io", "other").await,
            Err(StoreError::UniqueViolation(_))
        ));
        assert!(matches!(
            store.create_user("b@x.io", "alice").await,
            Err(StoreError::UniqueViolation(_))
        ));

        let group = store.create_group(user.id, "eng", &[user.id]).await.unwrap();
        assert!(matches!(
            store.add_member(user.id, group.id).await,
            Err(StoreError::UniqueViolation(_))
        ));

        let agent = store.create_agent("reports").await.unwrap();
        store.grant_to_group(group.id, agent.id).await.unwrap();
        assert!(matches!(
            store.grant_to_group(group.id, agent.id).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn approval_marks_bid_and_creates_group() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@x.io", "alice").await.unwrap();
        let bid = store.create_bid(user.id, "eng").await.unwrap();
        assert!(matches!(
            store.create_bid(user.id, "eng").await,
            Err(StoreError::UniqueViolation(_))
        ));

        let group = store.approve_bid(bid.id, &[user.id]).await.unwrap();
        assert_eq!(group.owner_id, user.id);
        assert!(store.find_pending_bid("eng").await.unwrap().is_none());
        assert!(matches!(
            store.approve_bid(bid.id, &[user.id]).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_approval_leaves_bid_pending() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@x.io", "alice").await.unwrap();
        let bid = store.create_bid(user.id, "eng").await.unwrap();
        store.create_group(user.id, "eng", &[user.id]).await.unwrap();

        assert!(matches!(
            store.approve_bid(bid.id, &[user.id]).await,
            Err(StoreError::UniqueViolation(_))
        ));
        let pending = store.find_user_pending_bid(user.id, "eng").await.unwrap();
        assert_eq!(pending.map(|b| b.id), Some(bid.id));
    }

    #[tokio::test]
    async fn deleting_an_agent_drops_its_grants() {
        let store = InMemoryStore::new();
        let user = store.create_user("a@x.io", "alice").await.unwrap();
        let group = store.create_group(user.id, "eng", &[user.id]).await.unwrap();
        let agent = store.create_agent("reports").await.unwrap();
        store.grant_to_group(group.id, agent.id).await.unwrap();
        store.grant_to_user(user.id, agent.id).await.unwrap();

        store.delete_agent(agent.id).await.unwrap();
        assert!(!store.is_group_agent(group.id, agent.id).await.unwrap());
        assert!(store.list_user_agents(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn common_groups_are_the_intersection() {
        let store = InMemoryStore::new();
        let a = store.create_user("a@x.io", "alice").await.unwrap();
        let b = store.create_user("b@x.io", "bob").await.unwrap();
        store.create_group(a.id, "zeta", &[a.id, b.id]).await.unwrap();
        store.create_group(a.id, "alpha", &[a.id, b.id]).await.unwrap();
        store.create_group(a.id, "solo", &[a.id]).await.unwrap();

        let names: Vec<String> = store
            .list_common_groups(a.id, b.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(store.list_user_groups(a.id).await.unwrap().len(), 3);
        assert_eq!(store.list_owned_groups(b.id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn transfer_makes_new_owner_a_participant() {
        let store = InMemoryStore::new();
        let a = store.create_user("a@x.io", "alice").await.unwrap();
        let b = store.create_user("b@x.io", "bob").await.unwrap();
        let group = store.create_group(a.id, "eng", &[a.id]).await.unwrap();

        let group = store.transfer_ownership(group.id, b.id).await.unwrap();
        assert!(group.is_owned_by(b.id));
        assert!(store.is_participant(b.id, group.id).await.unwrap());
    }
}
