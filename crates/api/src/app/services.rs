//! Process wiring: storage backend, root bootstrap, token codec.

use std::sync::Arc;

use axum::http::HeaderValue;
use thiserror::Error;
use tracing::{info, warn};

use gatekeeper_access::AccessServices;
use gatekeeper_auth::{RootIdentity, TokenCodec, generate_secret};
use gatekeeper_core::{DomainError, Email};
use gatekeeper_infra::{
    AccessStore, Config, InMemoryStore, PostgresStore, StoreError, bootstrap_root,
    config::RootConfig,
};

use crate::middleware::HttpOptions;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid root identity: {0}")]
    Root(#[from] DomainError),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("invalid cors origin {0:?}")]
    CorsOrigin(String),
}

/// Shared state handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AccessServices>,
    pub codec: TokenCodec,
}

/// Postgres when a database URL is configured, the in-memory store otherwise.
pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let store: Arc<dyn AccessStore> = match config.database.url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database.max_connections).await?;
            info!(max_connections = config.database.max_connections, "connected to postgres");
            Arc::new(store)
        }
        None => {
            warn!("no database url configured; state lives in memory only");
            Arc::new(InMemoryStore::new())
        }
    };

    let secret = match &config.secret_key {
        Some(secret) => secret.clone(),
        None => {
            warn!("no secret key configured; tokens will not survive a restart");
            generate_secret()
        }
    };

    state_with_store(store, &config.root, &secret).await
}

/// Bootstrap `store` and build the services over it.
pub async fn state_with_store(
    store: Arc<dyn AccessStore>,
    root: &RootConfig,
    secret: &str,
) -> Result<AppState, StartupError> {
    let email = Email::parse(&root.email)?;
    let root_user = bootstrap_root(store.as_ref(), email.as_str(), &root.username).await?;
    info!(root = %root_user.email, "root bootstrapped");

    let identity = RootIdentity::new(email);
    Ok(AppState {
        services: Arc::new(AccessServices::new(store, identity)),
        codec: TokenCodec::new(secret),
    })
}

pub fn http_options(config: &Config) -> Result<HttpOptions, StartupError> {
    let origin = &config.server.cors_origin;
    let cors_origin = HeaderValue::from_str(origin)
        .map_err(|_| StartupError::CorsOrigin(origin.clone()))?;
    Ok(HttpOptions {
        cors_origin,
        request_timeout: config.server.write_timeout(),
    })
}
