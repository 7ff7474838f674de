//! Domain error model.
//!
//! Every failure a use case can report falls into one of a handful of kinds.
//! The HTTP layer maps kinds to status codes; the message travels to the
//! client verbatim, except for [`DomainError::Internal`].

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or disallowed input.
    #[error("{0}")]
    Validation(String),

    /// A referenced user, group, agent or bid does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation collides with existing state (duplicates, pending bids, ownership).
    #[error("{0}")]
    Conflict(String),

    /// The acting user lacks the rights for the operation.
    #[error("{0}")]
    Forbidden(String),

    /// No usable identity was presented.
    #[error("{0}")]
    Unauthenticated(String),

    /// Storage or other infrastructure failure; never shown to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error stems from infrastructure rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Client-facing messages shared between use cases and tests.
pub mod msg {
    pub const USER_NOT_EXIST: &str = "user is not exist";
    pub const USER_EMAIL_EXIST: &str = "user with this email already exist";
    pub const USERNAME_EXIST: &str = "user with this username already exist";
    pub const SAME_EMAILS: &str = "user emails must be different";
    pub const GROUP_NOT_EXIST: &str = "group is not exist";
    pub const GROUP_EXIST: &str = "group with this name already exist";
    pub const AGENT_NOT_EXIST: &str = "agent is not exist";
    pub const AGENT_EXIST: &str = "agent with this name already exist";
    pub const BID_EXIST: &str = "bid with this name already exist";
    pub const BID_NOT_EXIST: &str = "user doesn't have bid with this name";
    pub const BID_DECIDED: &str = "bid has already been decided";
    pub const INVALID_BID_STATUS: &str = "invalid bid status, allowed values: approved, rejected";
    pub const USER_NOT_IN_GROUP: &str = "user is not in group";
    pub const USER_ALREADY_IN_GROUP: &str = "user is already in group";
    pub const NOT_ENOUGH_RIGHTS: &str = "user doesn't have enough rights";
    pub const NOT_ROOT: &str = "only root user can do this";
    pub const NOT_OWNER: &str = "user is not an owner";
    pub const ALREADY_OWNER: &str = "user is already an owner of this group";
    pub const KICK_ROOT: &str = "user doesn't have enough rights to delete root user from group";
    pub const KICK_OWNER: &str =
        "to leave a group you need to remove the rights of the group owner";
    pub const DEFAULT_GROUP_OWNER: &str = "only root can be an owner of users group";
    pub const DELETE_ROOT: &str = "can't delete root user";
    pub const DELETE_OTHER_USER: &str = "user doesn't have enough rights to delete another user";
    pub const USER_OWNS_GROUPS: &str =
        "user is responsible for group/groups, so root user need to appoint new owner";
    pub const AGENT_ALREADY_IN_GROUP: &str =
        "agent with this name already belongs to the selected group";
    pub const AGENT_NOT_IN_GROUP: &str = "agent with this name not belongs to the selected group";
    pub const AGENT_ALREADY_IN_USER: &str = "agent with this name already belongs to the user";
    pub const AGENT_NOT_IN_USER: &str = "agent with this name not belongs to the user";
    pub const USER_AGENTS_FORBIDDEN: &str = "you can't get user agents";
    pub const INVALID_TOKEN: &str = "invalid jwt-token";
    pub const MISSING_TOKEN: &str = "jwt-token is missing";
    pub const IDENTITY_MISMATCH: &str = "authenticated user doesn't match acting user";
    pub const INVALID_DATA: &str = "you has passed invalid data in request data";
    pub const ROUTE_NOT_FOUND: &str = "route not found";
    pub const INTERNAL: &str = "internal server error, please try again later";
    pub const REQUEST_TIMEOUT: &str = "request timed out";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_facing_variants_display_their_message() {
        let err = DomainError::not_found(msg::GROUP_NOT_EXIST);
        assert_eq!(err.to_string(), "group is not exist");
        assert!(!err.is_internal());
    }

    #[test]
    fn internal_errors_are_flagged() {
        let err = DomainError::internal("connection reset");
        assert!(err.is_internal());
        assert!(err.to_string().contains("connection reset"));
    }
}
