//! Membership and ownership of groups.

use std::sync::Arc;

use tracing::{info, instrument};

use gatekeeper_auth::RootIdentity;
use gatekeeper_core::error::msg;
use gatekeeper_core::{DomainError, DomainResult, Email, Group, GroupName};
use gatekeeper_infra::AccessStore;
use gatekeeper_infra::store::GroupRegistry;

use crate::lookup;

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl GroupService {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    /// Add `user_email` to the group on behalf of its owner or root.
    #[instrument(skip(self), err)]
    pub async fn add_user_to_group(
        &self,
        user_email: &str,
        inviter_email: &str,
        group_name: &str,
    ) -> DomainResult<String> {
        let group_name = GroupName::parse(group_name)?;
        let user_email = Email::parse(user_email)?;
        let inviter_email = Email::parse(inviter_email)?;
        let store = self.store.as_ref();

        let group = lookup::group(store, &group_name).await?;
        if user_email == inviter_email {
            return Err(DomainError::validation(msg::SAME_EMAILS));
        }
        let user = lookup::user(store, &user_email).await?;
        let inviter = lookup::user(store, &inviter_email).await?;
        if !group.is_owned_by(inviter.id) && !self.root.is_root(&inviter_email) {
            return Err(DomainError::forbidden(msg::NOT_ENOUGH_RIGHTS));
        }
        if store.is_participant(user.id, group.id).await? {
            return Err(DomainError::conflict(msg::USER_ALREADY_IN_GROUP));
        }
        store.add_member(user.id, group.id).await?;

        info!(group = %group.name, user = %user.email, "user added to group");
        Ok(group.name)
    }

    /// The subject's groups, or the groups shared with the asker when they differ.
    #[instrument(skip(self), err)]
    pub async fn get_user_groups(
        &self,
        user_email: &str,
        asker_email: &str,
    ) -> DomainResult<Vec<Group>> {
        let user_email = Email::parse(user_email)?;
        let asker_email = Email::parse(asker_email)?;
        let store = self.store.as_ref();

        let user = lookup::user(store, &user_email).await?;
        if user_email == asker_email {
            return Ok(store.list_user_groups(user.id).await?);
        }
        let asker = lookup::user(store, &asker_email).await?;
        Ok(store.list_common_groups(user.id, asker.id).await?)
    }

    /// Remove a participant. Users may leave on their own; others need the
    /// owner or root. Neither root nor the owner can be removed.
    #[instrument(skip(self), err)]
    pub async fn kick_user_from_group(
        &self,
        user_email: &str,
        kicker_email: &str,
        group_name: &str,
    ) -> DomainResult<String> {
        let group_name = GroupName::parse(group_name)?;
        let user_email = Email::parse(user_email)?;
        let kicker_email = Email::parse(kicker_email)?;
        let store = self.store.as_ref();

        let group = lookup::group(store, &group_name).await?;
        if self.root.is_root(&user_email) {
            return Err(DomainError::forbidden(msg::KICK_ROOT));
        }
        let user = lookup::user(store, &user_email).await?;
        if !store.is_participant(user.id, group.id).await? {
            return Err(DomainError::not_found(msg::USER_NOT_IN_GROUP));
        }
        if group.is_owned_by(user.id) {
            return Err(DomainError::forbidden(msg::KICK_OWNER));
        }
        if user_email != kicker_email {
            let kicker = lookup::user(store, &kicker_email).await?;
            if !group.is_owned_by(kicker.id) && !self.root.is_root(&kicker_email) {
                return Err(DomainError::forbidden(msg::NOT_ENOUGH_RIGHTS));
            }
        }
        store.remove_member(user.id, group.id).await?;

        info!(group = %group.name, user = %user.email, kicker = %kicker_email, "user removed from group");
        Ok(group.name)
    }

    /// Hand the group to `new_owner_email`, who also becomes a participant.
    #[instrument(skip(self), err)]
    pub async fn change_owner(
        &self,
        new_owner_email: &str,
        group_name: &str,
        acting_email: &str,
    ) -> DomainResult<Group> {
        let group_name = GroupName::parse(group_name)?;
        let new_owner_email = Email::parse(new_owner_email)?;
        let acting_email = Email::parse(acting_email)?;
        let store = self.store.as_ref();

        let group = lookup::group(store, &group_name).await?;
        let new_owner = lookup::user(store, &new_owner_email).await?;
        if group.is_owned_by(new_owner.id) {
            return Err(DomainError::conflict(msg::ALREADY_OWNER));
        }

        let acting_is_root = self.root.is_root(&acting_email);
        if group_name.is_default() {
            if !acting_is_root || !self.root.is_root(&new_owner_email) {
                return Err(DomainError::forbidden(msg::DEFAULT_GROUP_OWNER));
            }
        } else if !acting_is_root {
            let acting = lookup::user(store, &acting_email).await?;
            if !group.is_owned_by(acting.id) {
                return Err(DomainError::forbidden(msg::NOT_OWNER));
            }
        }

        let group = store.transfer_ownership(group.id, new_owner.id).await?;
        info!(group = %group.name, owner = %new_owner.email, "group ownership transferred");
        Ok(group)
    }
}
