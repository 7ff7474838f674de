//! Validated names and addresses.
//!
//! Value objects have no identity: two values with the same text are the same
//! value. Each type here can only be obtained through `parse`, so holding one
//! means the text already passed validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Name of the protected default group every new user joins.
pub const DEFAULT_GROUP: &str = "users";

const MAX_EMAIL_LEN: usize = 254;

/// A normalized email address: trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();
        let invalid = || DomainError::validation(format!("invalid email: {raw:?}"));

        if email.is_empty() || email.len() > MAX_EMAIL_LEN {
            return Err(invalid());
        }
        if email.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(invalid());
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Public handle of a user: 2 to 30 Latin or Cyrillic letters, digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        let len = name.chars().count();
        let allowed = name.chars().all(username_char);
        if !(2..=30).contains(&len) || !allowed {
            return Err(DomainError::validation(
                "username must be 2-30 characters long and contain only letters, digits or '_'",
            ));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn username_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Non-empty; letters and digits of any script, spaces, `_`, `-` and `.`.
/// Names travel as path segments, so `/` never qualifies.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
}

/// Name of a group, unique across groups and pending bids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if !valid_name(name) {
            return Err(DomainError::validation(format!("invalid group name: {raw:?}")));
        }
        Ok(Self(name.to_owned()))
    }

    /// Whether this is the protected default group.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_GROUP
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if !valid_name(name) {
            return Err(DomainError::validation(format!("invalid agent name: {raw:?}")));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_text_value {
    ($($t:ty),+) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl AsRef<str> for $t {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

impl_text_value!(Email, Username, GroupName, AgentName);
