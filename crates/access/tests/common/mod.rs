#![allow(dead_code)]

use std::sync::Arc;

use gatekeeper_access::AccessServices;
use gatekeeper_auth::RootIdentity;
use gatekeeper_core::{DomainError, Email, User};
use gatekeeper_infra::{InMemoryStore, bootstrap_root};

pub const ROOT: &str = "root@gatekeeper.local";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub services: AccessServices,
    pub root: User,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let root = bootstrap_root(store.as_ref(), ROOT, "root").await.unwrap();
        let identity = RootIdentity::new(Email::parse(ROOT).unwrap());
        let services = AccessServices::new(store.clone(), identity);
        Self {
            store,
            services,
            root,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        self.services
            .users
            .sign_up(&email(name), name)
            .await
            .unwrap()
    }

    /// Create a group owned by `owner` through the bid workflow.
    pub async fn group(&self, owner: &str, group: &str) {
        self.services
            .bids
            .make_request_to_create_group(&email(owner), group)
            .await
            .unwrap();
        self.services
            .bids
            .update_request_status(&email(owner), group, ROOT, "approved")
            .await
            .unwrap();
    }

    pub async fn agent(&self, name: &str) {
        self.services.agents.create_agent(ROOT, name).await.unwrap();
    }

    pub async fn group_names(&self, user: &str) -> Vec<String> {
        self.services
            .groups
            .get_user_groups(&email(user), &email(user))
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect()
    }

    pub async fn can(&self, user: &str, agent: &str) -> bool {
        self.services
            .resolver
            .can_execute(&email(user), agent)
            .await
            .unwrap()
    }
}

pub fn email(name: &str) -> String {
    format!("{name}@example.com")
}

pub fn is_conflict(err: &DomainError) -> bool {
    matches!(err, DomainError::Conflict(_))
}

pub fn is_forbidden(err: &DomainError) -> bool {
    matches!(err, DomainError::Forbidden(_))
}

pub fn is_not_found(err: &DomainError) -> bool {
    matches!(err, DomainError::NotFound(_))
}
