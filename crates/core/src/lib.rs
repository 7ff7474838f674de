//! `gatekeeper-core`: domain vocabulary for group-based access control.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, validated names, the user/group/agent entities and the bid
//! state machine.

pub mod bid;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use bid::{Bid, BidDecision, BidStatus, BidView};
pub use entity::{Agent, Group, User};
pub use error::{DomainError, DomainResult};
pub use id::{AgentId, BidId, GroupId, UserId};
pub use value_object::{AgentName, DEFAULT_GROUP, Email, GroupName, Username};
