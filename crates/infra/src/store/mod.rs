//! Storage boundary for users, groups, bids, agents and grants.
//!
//! Services depend on the traits only; `InMemoryStore` backs tests and local
//! runs, `PostgresStore` backs deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{
    AccessStore, AgentStore, BidStore, GroupRegistry, PrivilegeStore, StoreError, StoreResult,
    UserDirectory,
};
