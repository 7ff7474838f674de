//! Requests to create groups and root's decisions on them.

use std::sync::Arc;

use tracing::{info, instrument};

use gatekeeper_auth::RootIdentity;
use gatekeeper_core::error::msg;
use gatekeeper_core::{BidDecision, BidStatus, BidView, DomainError, DomainResult, Email, GroupName};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::{BidStore, GroupRegistry};

use crate::lookup;

#[derive(Clone)]
pub struct BidService {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl BidService {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    /// File a bid for `group_name`. Root's bids materialize the group at once.
    #[instrument(skip(self), err)]
    pub async fn make_request_to_create_group(
        &self,
        requester_email: &str,
        group_name: &str,
    ) -> DomainResult<BidView> {
        let group_name = GroupName::parse(group_name)?;
        let requester_email = Email::parse(requester_email)?;
        let store = self.store.as_ref();

        let requester = lookup::user(store, &requester_email).await?;
        if store.get_group(group_name.as_str()).await?.is_some() {
            return Err(DomainError::conflict(msg::GROUP_EXIST));
        }
        if store.find_pending_bid(group_name.as_str()).await?.is_some() {
            return Err(DomainError::conflict(msg::BID_EXIST));
        }

        if self.root.is_root(&requester_email) {
            let group = store
                .create_group(requester.id, group_name.as_str(), &[requester.id])
                .await?;
            info!(group = %group.name, "group created by root");
            return Ok(BidView::approved(&group));
        }

        let bid = store.create_bid(requester.id, group_name.as_str()).await?;
        info!(bid_id = %bid.id, group = %bid.group_name, requester = %requester.email, "bid created");
        Ok(BidView::from(&bid))
    }

    /// Approve or reject the requester's pending bid. Root only.
    #[instrument(skip(self), err)]
    pub async fn update_request_status(
        &self,
        requester_email: &str,
        group_name: &str,
        acting_email: &str,
        status: &str,
    ) -> DomainResult<BidView> {
        let decision: BidDecision = status.parse()?;
        let group_name = GroupName::parse(group_name)?;
        let requester_email = Email::parse(requester_email)?;
        let acting_email = Email::parse(acting_email)?;
        let store = self.store.as_ref();

        if !self.root.is_root(&acting_email) {
            return Err(DomainError::forbidden(msg::NOT_ROOT));
        }
        let requester = lookup::user(store, &requester_email).await?;
        let bid = store
            .find_user_pending_bid(requester.id, group_name.as_str())
            .await?
            .ok_or_else(|| DomainError::not_found(msg::BID_NOT_EXIST))?;

        match bid.decide(decision)? {
            BidStatus::Rejected => {
                let bid = store.reject_bid(bid.id).await?;
                info!(bid_id = %bid.id, group = %bid.group_name, "bid rejected");
                Ok(BidView::from(&bid))
            }
            _ => {
                if store.get_group(group_name.as_str()).await?.is_some() {
                    return Err(DomainError::conflict(msg::GROUP_EXIST));
                }
                let root = lookup::user(store, &acting_email).await?;
                let mut members = vec![requester.id];
                if root.id != requester.id {
                    members.push(root.id);
                }
                let group = store.approve_bid(bid.id, &members).await?;
                info!(bid_id = %bid.id, group = %group.name, owner = %requester.email, "bid approved");
                Ok(BidView::approved(&group))
            }
        }
    }
}
