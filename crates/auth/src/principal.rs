use serde::{Deserialize, Serialize};

use gatekeeper_core::{Email, User};

/// The username a verified token was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Whether this identity is the given user.
    pub fn is(&self, user: &User) -> bool {
        self.username == user.username
    }
}

/// The configured superuser, matched by email.
///
/// Every root check in the workspace goes through this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootIdentity {
    email: Email,
}

impl RootIdentity {
    pub fn new(email: Email) -> Self {
        Self { email }
    }

    pub fn is_root(&self, email: &Email) -> bool {
        &self.email == email
    }
}
