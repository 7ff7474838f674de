//! Group-creation bids.
//!
//! A bid starts `in_progress` and is decided exactly once by root:
//!
//! ```text
//! in_progress ──approve──▶ approved
//!      │
//!      └──────reject────▶ rejected
//! ```
//!
//! `Bid::decide` is the pure transition function; storage applies its result.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::Group;
use crate::error::{DomainError, DomainResult, msg};
use crate::id::{BidId, UserId};

/// Lifecycle state of a bid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    InProgress,
    Approved,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!("unknown bid status: {other}"))),
        }
    }
}

/// Root's verdict on a pending bid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BidDecision {
    Approve,
    Reject,
}

impl FromStr for BidDecision {
    type Err = DomainError;

    /// Accepts the target status names, `approved` or `rejected`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "approved" => Ok(Self::Approve),
            "rejected" => Ok(Self::Reject),
            _ => Err(DomainError::validation(msg::INVALID_BID_STATUS)),
        }
    }
}

/// A request to create a group under a given name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub user_id: UserId,
    pub group_name: String,
    pub status: BidStatus,
}

impl Bid {
    /// A fresh `in_progress` bid.
    pub fn open(user_id: UserId, group_name: impl Into<String>) -> Self {
        Self {
            id: BidId::new(),
            user_id,
            group_name: group_name.into(),
            status: BidStatus::InProgress,
        }
    }

    /// Compute the state a decision leads to, without mutating.
    pub fn decide(&self, decision: BidDecision) -> DomainResult<BidStatus> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(msg::BID_DECIDED));
        }
        Ok(match decision {
            BidDecision::Approve => BidStatus::Approved,
            BidDecision::Reject => BidStatus::Rejected,
        })
    }
}

/// Projection shared by decided bids and groups materialized from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidView {
    pub id: Uuid,
    pub group_name: String,
    pub owner_id: UserId,
    pub status: BidStatus,
}

impl BidView {
    /// View of a group that exists, so its bid counts as approved.
    pub fn approved(group: &Group) -> Self {
        Self {
            id: *group.id.as_uuid(),
            group_name: group.name.clone(),
            owner_id: group.owner_id,
            status: BidStatus::Approved,
        }
    }
}

impl From<&Bid> for BidView {
    fn from(bid: &Bid) -> Self {
        Self {
            id: *bid.id.as_uuid(),
            group_name: bid.group_name.clone(),
            owner_id: bid.user_id,
            status: bid.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::GroupId;

    #[test]
    fn pending_bid_can_be_approved_or_rejected() {
        let bid = Bid::open(UserId::new(), "eng");
        assert_eq!(bid.decide(BidDecision::Approve).unwrap(), BidStatus::Approved);
        assert_eq!(bid.decide(BidDecision::Reject).unwrap(), BidStatus::Rejected);
    }

    #[test]
    fn terminal_states_reject_further_decisions() {
        for status in [BidStatus::Approved, BidStatus::Rejected] {
            let bid = Bid {
                status,
                ..Bid::open(UserId::new(), "eng")
            };
            let err = bid.decide(BidDecision::Approve).unwrap_err();
            assert_eq!(err, DomainError::conflict(msg::BID_DECIDED));
        }
    }

    #[test]
    fn decision_accepts_only_target_statuses() {
        assert_eq!("approved".parse::<BidDecision>().unwrap(), BidDecision::Approve);
        assert_eq!("rejected".parse::<BidDecision>().unwrap(), BidDecision::Reject);
        for raw in ["in_progress", "APPROVED", ""] {
            assert!(matches!(raw.parse::<BidDecision>(), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn status_serializes_in_snake_case() {
        let json = serde_json::to_string(&BidStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!("rejected".parse::<BidStatus>().unwrap(), BidStatus::Rejected);
    }

    #[test]
    fn views_unify_bids_and_groups() {
        let owner = UserId::new();
        let group = Group {
            id: GroupId::new(),
            name: "eng".into(),
            owner_id: owner,
        };
        let view = BidView::approved(&group);
        assert_eq!(view.id, *group.id.as_uuid());
        assert_eq!(view.owner_id, owner);
        assert_eq!(view.status, BidStatus::Approved);

        let bid = Bid::open(owner, "ops");
        let view = BidView::from(&bid);
        assert_eq!(view.status, BidStatus::InProgress);
        assert_eq!(view.group_name, "ops");
    }
}
