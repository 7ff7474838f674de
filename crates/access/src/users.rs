//! User profiles: sign-up, lookup and guarded deletion.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use gatekeeper_auth::{Identity, RootIdentity};
use gatekeeper_core::error::msg;
use gatekeeper_core::{DEFAULT_GROUP, DomainError, DomainResult, Email, User, Username};
use gatekeeper_infra::store::{GroupRegistry, StoreError, UserDirectory};
use gatekeeper_infra::AccessStore;

use crate::lookup;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn AccessStore>,
    root: RootIdentity,
}

impl UserService {
    pub fn new(store: Arc<dyn AccessStore>, root: RootIdentity) -> Self {
        Self { store, root }
    }

    /// Register a user and enrol them in the default group.
    #[instrument(skip(self), err)]
    pub async fn sign_up(&self, email: &str, username: &str) -> DomainResult<User> {
        let email = Email::parse(email)?;
        let username = Username::parse(username)?;
        let store = self.store.as_ref();

        if store.get_user_by_email(email.as_str()).await?.is_some() {
            return Err(DomainError::conflict(msg::USER_EMAIL_EXIST));
        }
        if store.get_user_by_username(username.as_str()).await?.is_some() {
            return Err(DomainError::conflict(msg::USERNAME_EXIST));
        }
        let user = store.create_user(email.as_str(), username.as_str()).await?;

        match store.get_group(DEFAULT_GROUP).await? {
            Some(group) => match store.add_member(user.id, group.id).await {
                Ok(()) | Err(StoreError::UniqueViolation(_)) => {}
                Err(e) => return Err(e.into()),
            },
            None => warn!(group = DEFAULT_GROUP, "default group missing, user not enrolled"),
        }

        info!(user_id = %user.id, email = %user.email, "user signed up");
        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn read_user(&self, email: &str) -> DomainResult<User> {
        lookup::user(self.store.as_ref(), &Email::parse(email)?).await
    }

    /// Users may delete themselves; root may delete anyone but itself.
    /// Owners must hand over their groups first.
    #[instrument(skip(self), err)]
    pub async fn delete_user(&self, email: &str, deleting_email: &str) -> DomainResult<()> {
        let email = Email::parse(email)?;
        let deleting_email = Email::parse(deleting_email)?;
        let store = self.store.as_ref();

        if self.root.is_root(&email) {
            return Err(DomainError::forbidden(msg::DELETE_ROOT));
        }
        let user = lookup::user(store, &email).await?;
        if !store.list_owned_groups(user.id).await?.is_empty() {
            return Err(DomainError::conflict(msg::USER_OWNS_GROUPS));
        }
        if email != deleting_email && !self.root.is_root(&deleting_email) {
            return Err(DomainError::forbidden(msg::DELETE_OTHER_USER));
        }
        store.delete_user(user.id).await?;

        info!(user_id = %user.id, email = %user.email, "user deleted");
        Ok(())
    }

    /// When a verified identity accompanies the request, it must be the
    /// acting user named in the path.
    pub async fn ensure_acting(
        &self,
        identity: Option<&Identity>,
        acting_email: &str,
    ) -> DomainResult<()> {
        let Some(identity) = identity else {
            return Ok(());
        };
        let acting_email = Email::parse(acting_email)?;
        match self.store.get_user_by_email(acting_email.as_str()).await? {
            Some(user) if !identity.is(&user) => {
                Err(DomainError::forbidden(msg::IDENTITY_MISMATCH))
            }
            _ => Ok(()),
        }
    }
}
