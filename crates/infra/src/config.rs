//! Process configuration.
//!
//! # Load Order
//!
//! 1. Default values
//! 2. TOML file (`GATEKEEPER_CONFIG`, default `./config/config.toml`)
//! 3. Environment variables (`GATEKEEPER_*`, `DATABASE_URL`)
//!
//! Each layer overrides the previous. A missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use gatekeeper_core::Email;

pub const CONFIG_PATH_VAR: &str = "GATEKEEPER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    /// Upper bound on handling one request, in seconds.
    pub write_timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_secs: u64,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8010".into(),
            write_timeout_secs: 5,
            shutdown_secs: 10,
            cors_origin: "http://localhost:3000".into(),
        }
    }
}

impl ServerConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL; without one the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub email: String,
    pub username: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            email: "root@gatekeeper.local".into(),
            username: "root".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub root: RootConfig,
    /// HMAC secret for tokens. Generated at startup when absent.
    pub secret_key: Option<String>,
}

impl Config {
    /// Load from the file named by `GATEKEEPER_CONFIG` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_with(Path::new(&path), |var| std::env::var(var).ok())
    }

    /// Load from `path` with environment lookups going through `env`.
    pub fn load_with(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match Self::load_file(path)? {
            Some(config) => config,
            None => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(Some(config))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = env("GATEKEEPER_SERVER_ADDRESS") {
            self.server.address = val;
        }
        if let Some(val) = env("GATEKEEPER_WRITE_TIMEOUT_SECS") {
            self.server.write_timeout_secs = parse_secs("GATEKEEPER_WRITE_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = env("GATEKEEPER_SHUTDOWN_SECS") {
            self.server.shutdown_secs = parse_secs("GATEKEEPER_SHUTDOWN_SECS", &val)?;
        }
        if let Some(val) = env("GATEKEEPER_CORS_ORIGIN") {
            self.server.cors_origin = val;
        }
        if let Some(val) = env("DATABASE_URL") {
            self.database.url = Some(val).filter(|url| !url.is_empty());
        }
        if let Some(val) = env("GATEKEEPER_ROOT_EMAIL") {
            self.root.email = val;
        }
        if let Some(val) = env("GATEKEEPER_ROOT_USERNAME") {
            self.root.username = val;
        }
        if let Some(val) = env("GATEKEEPER_SECRET_KEY") {
            self.secret_key = Some(val).filter(|key| !key.is_empty());
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let email = Email::parse(&self.root.email)
            .map_err(|e| ConfigError::Invalid(format!("root.email: {e}")))?;
        self.root.email = email.as_str().to_owned();
        if self.server.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid("server.write_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

fn parse_secs(var: &'static str, val: &str) -> Result<u64, ConfigError> {
    val.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        var,
        reason: format!("expected whole seconds, got {val:?}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_with(Path::new("/nonexistent/gatekeeper.toml"), no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.address, "0.0.0.0:8010");
        assert_eq!(config.server.write_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(10));
        assert!(config.database.url.is_none());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            secret_key = "s3cret"

            [server]
            address = "127.0.0.1:9000"

            [root]
            email = "admin@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.server.write_timeout_secs, 5);
        assert_eq!(config.root.email, "admin@example.com");
        assert_eq!(config.root.username, "root");
        assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::from_toml("[server\naddress = 1").is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GATEKEEPER_SERVER_ADDRESS", "127.0.0.1:7000"),
            ("GATEKEEPER_WRITE_TIMEOUT_SECS", "30"),
            ("DATABASE_URL", "postgres://localhost/gatekeeper"),
            ("GATEKEEPER_ROOT_EMAIL", "Boss@Example.com"),
            ("GATEKEEPER_SECRET_KEY", ""),
        ]);
        let config = Config::load_with(Path::new("/nonexistent/gatekeeper.toml"), |var| {
            env.get(var).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.server.address, "127.0.0.1:7000");
        assert_eq!(config.server.write_timeout_secs, 30);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/gatekeeper"));
        assert_eq!(config.root.email, "boss@example.com");
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn bad_numbers_and_emails_are_rejected() {
        let err = Config::load_with(Path::new("/nonexistent"), |var| {
            (var == "GATEKEEPER_SHUTDOWN_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));

        let err = Config::load_with(Path::new("/nonexistent"), |var| {
            (var == "GATEKEEPER_ROOT_EMAIL").then(|| "nobody".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn example_config_parses() {
        let config = Config::from_toml(include_str!("../../../config/config.example.toml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.database.url, None);
        assert_eq!(config.secret_key.as_deref(), Some("change-me"));
    }
}
