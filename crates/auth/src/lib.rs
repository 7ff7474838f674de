//! `gatekeeper-auth`: token codec, root identity and privilege union.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod token;

pub use authorize::EffectivePrivileges;
pub use claims::{TOKEN_TTL_DAYS, TokenHeader, TokenPayload};
pub use principal::{Identity, RootIdentity};
pub use token::{TOKEN_COOKIE, TokenCodec, TokenError, generate_secret};
