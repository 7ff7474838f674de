use async_trait::async_trait;
use thiserror::Error;

use gatekeeper_core::{Agent, AgentId, Bid, BidId, DomainError, Group, GroupId, User, UserId};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule (email, name, edge, pending bid) was violated.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row the operation depends on is missing or no longer in the expected state.
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => DomainError::conflict(msg),
            StoreError::NotFound(msg) => DomainError::not_found(msg),
            StoreError::Backend(msg) => DomainError::internal(msg),
        }
    }
}

/// User profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, email: &str, username: &str) -> StoreResult<User>;

    /// Removes the user together with their participations and direct grants.
    async fn delete_user(&self, user_id: UserId) -> StoreResult<()>;
}

/// Groups and participation edges.
#[async_trait]
pub trait GroupRegistry: Send + Sync {
    async fn get_group(&self, name: &str) -> StoreResult<Option<Group>>;

    /// Creates the group and inserts each of `members` as a participant, atomically.
    async fn create_group(
        &self,
        owner_id: UserId,
        name: &str,
        members: &[UserId],
    ) -> StoreResult<Group>;

    async fn is_participant(&self, user_id: UserId, group_id: GroupId) -> StoreResult<bool>;

    /// Fails with `UniqueViolation` when the user already participates.
    async fn add_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()>;

    async fn remove_member(&self, user_id: UserId, group_id: GroupId) -> StoreResult<()>;

    /// Groups the user participates in, ordered by name.
    async fn list_user_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>>;

    /// Groups both users participate in, ordered by name.
    async fn list_common_groups(&self, a: UserId, b: UserId) -> StoreResult<Vec<Group>>;

    async fn list_owned_groups(&self, user_id: UserId) -> StoreResult<Vec<Group>>;

    /// Sets the owner and makes them a participant if they are not one yet.
    async fn transfer_ownership(&self, group_id: GroupId, new_owner: UserId) -> StoreResult<Group>;
}

/// Group-creation bids.
#[async_trait]
pub trait BidStore: Send + Sync {
    /// The pending bid for `group_name`, whoever made it.
    async fn find_pending_bid(&self, group_name: &str) -> StoreResult<Option<Bid>>;

    async fn find_user_pending_bid(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> StoreResult<Option<Bid>>;

    /// Fails with `UniqueViolation` when a bid for the name is already pending.
    async fn create_bid(&self, user_id: UserId, group_name: &str) -> StoreResult<Bid>;

    /// Marks a pending bid rejected.
    async fn reject_bid(&self, bid_id: BidId) -> StoreResult<Bid>;

    /// Marks a pending bid approved and materializes its group with `members`
    /// as participants, all or nothing.
    async fn approve_bid(&self, bid_id: BidId, members: &[UserId]) -> StoreResult<Group>;
}

/// Agent catalogue.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent(&self, name: &str) -> StoreResult<Option<Agent>>;

    async fn create_agent(&self, name: &str) -> StoreResult<Agent>;

    /// Removes the agent and every grant referencing it.
    async fn delete_agent(&self, agent_id: AgentId) -> StoreResult<()>;

    /// All agents, ordered by name.
    async fn list_agents(&self) -> StoreResult<Vec<Agent>>;
}

/// Grant edges from agents to groups and users.
#[async_trait]
pub trait PrivilegeStore: Send + Sync {
    async fn grant_to_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()>;

    async fn revoke_from_group(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<()>;

    async fn is_group_agent(&self, group_id: GroupId, agent_id: AgentId) -> StoreResult<bool>;

    async fn list_group_agents(&self, group_id: GroupId) -> StoreResult<Vec<Agent>>;

    async fn grant_to_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()>;

    async fn revoke_from_user(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<()>;

    async fn is_user_agent(&self, user_id: UserId, agent_id: AgentId) -> StoreResult<bool>;

    /// Direct grants only.
    async fn list_user_agents(&self, user_id: UserId) -> StoreResult<Vec<Agent>>;
}

/// Everything the access services need from storage.
pub trait AccessStore: UserDirectory + GroupRegistry + BidStore + AgentStore + PrivilegeStore {}

impl<T> AccessStore for T where T: UserDirectory + GroupRegistry + BidStore + AgentStore + PrivilegeStore
{}
