use std::fmt;

use axum::Extension;
use uuid::Uuid;

use gatekeeper_auth::Identity;

/// Per-request correlation id, assigned before anything else runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The verified identity, when the request carried a valid token.
pub fn identity(ext: &Option<Extension<Identity>>) -> Option<&Identity> {
    ext.as_ref().map(|Extension(identity)| identity)
}
