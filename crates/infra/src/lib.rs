//! Infrastructure layer: storage backends, bootstrap and configuration.

pub mod bootstrap;
pub mod config;
pub mod store;

pub use bootstrap::{DEFAULT_AGENT, bootstrap_root};
pub use config::{Config, ConfigError};
pub use store::{AccessStore, InMemoryStore, PostgresStore, StoreError, StoreResult};
