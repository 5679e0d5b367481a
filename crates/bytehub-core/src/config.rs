//! Configuration management utilities

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bytehub.db?mode=rwc";
pub const DATABASE_URL_ENV: &str = "BYTEHUB_DATABASE_URL";
pub const MAX_CONNECTIONS_ENV: &str = "BYTEHUB_MAX_CONNECTIONS";
pub const MIN_CONNECTIONS_ENV: &str = "BYTEHUB_MIN_CONNECTIONS";

/// Catalog database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `BYTEHUB_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> StoreResult<Self> {
        let defaults = Self::default();
        let database_url = std::env::var(DATABASE_URL_ENV).unwrap_or(defaults.database_url);
        let max_connections = parse_env(MAX_CONNECTIONS_ENV)?.unwrap_or(defaults.max_connections);
        let min_connections = parse_env(MIN_CONNECTIONS_ENV)?.unwrap_or(defaults.min_connections);

        if min_connections > max_connections {
            return Err(StoreError::Configuration {
                message: format!(
                    "{} ({}) exceeds {} ({})",
                    MIN_CONNECTIONS_ENV, min_connections, MAX_CONNECTIONS_ENV, max_connections
                ),
            });
        }

        debug!(
            "Catalog pool: {}..{} connections",
            min_connections, max_connections
        );
        Ok(Self {
            database_url,
            max_connections,
            min_connections,
        })
    }
}

fn parse_env(key: &str) -> StoreResult<Option<u32>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StoreError::Configuration {
                message: format!("{} must be a positive integer, got {:?}", key, raw),
            }),
        Err(_) => Ok(None),
    }
}
