//! Configuration handling for the database access layer.
//!
//! Configuration is a read-only key-value source scoped per database name.
//! The only key required at driver-registration time is `driver`; the pool
//! collaborator additionally reads `url` and the optional `pool.*` keys.

use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration key holding the driver name for a database.
pub const DRIVER_KEY: &str = "driver";
/// Configuration key holding the connection URL for a database.
pub const URL_KEY: &str = "url";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connection pool options parsed from per-database `pool.*` keys.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10; 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> Duration {
        Duration::from_secs(
            self.acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("pool.max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "pool.min_connections ({}) cannot exceed pool.max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Read-only key-value configuration source, keyed per database name.
///
/// ```
/// use db_access::DbConfig;
///
/// let mut config = DbConfig::new();
/// config.set("default", "driver", "sqlite");
/// config.set("default", "url", "sqlite::memory:");
/// assert_eq!(config.get("default", "driver"), Some("sqlite"));
/// ```
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DbConfig {
    databases: HashMap<String, HashMap<String, String>>,
}

impl DbConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON object of the shape
    /// `{"<database>": {"<key>": "<value>", ...}, ...}`.
    pub fn from_json_str(json: &str) -> DbResult<Self> {
        let databases: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)
            .map_err(|e| DbError::internal(format!("Invalid configuration JSON: {}", e)))?;
        Ok(Self { databases })
    }

    /// Set a key for a database. Intended for the embedding application's
    /// configuration phase; the access layer itself only reads.
    pub fn set(
        &mut self,
        database: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.databases
            .entry(database.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Look up a key for a database.
    pub fn get(&self, database: &str, key: &str) -> Option<&str> {
        self.databases
            .get(database)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Look up a key, failing with a configuration error naming the
    /// database and key if absent.
    pub fn require(&self, database: &str, key: &str) -> DbResult<&str> {
        self.get(database, key)
            .ok_or_else(|| DbError::configuration(database, key))
    }

    /// Parse the `pool.*` keys for a database into typed options.
    /// Unparsable values fall back to the defaults.
    pub fn pool_options(&self, database: &str) -> PoolOptions {
        PoolOptions {
            max_connections: self.parse_key(database, "pool.max_connections"),
            min_connections: self.parse_key(database, "pool.min_connections"),
            idle_timeout_secs: self.parse_key(database, "pool.idle_timeout"),
            acquire_timeout_secs: self.parse_key(database, "pool.acquire_timeout"),
            test_before_acquire: self.parse_key(database, "pool.test_before_acquire"),
        }
    }

    fn parse_key<T: std::str::FromStr>(&self, database: &str, key: &str) -> Option<T> {
        self.get(database, key).and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_key_names_database_and_key() {
        let config = DbConfig::new();
        let err = config.require("default", DRIVER_KEY).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("default"));
        assert!(msg.contains("driver"));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = DbConfig::new();
        config.set("reports", "driver", "postgres");
        assert_eq!(config.get("reports", "driver"), Some("postgres"));
        assert_eq!(config.get("reports", "url"), None);
        assert_eq!(config.get("other", "driver"), None);
    }

    #[test]
    fn test_from_json_str() {
        let config = DbConfig::from_json_str(
            r#"{"default": {"driver": "sqlite", "url": "sqlite::memory:"}}"#,
        )
        .unwrap();
        assert_eq!(config.require("default", URL_KEY).unwrap(), "sqlite::memory:");
    }

    #[test]
    fn test_from_json_str_rejects_malformed_input() {
        assert!(DbConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_pool_options_parsed_with_defaults() {
        let mut config = DbConfig::new();
        config.set("default", "pool.max_connections", "5");
        config.set("default", "pool.test_before_acquire", "false");

        let opts = config.pool_options("default");
        assert_eq!(opts.max_connections_or_default(false), 5);
        assert_eq!(opts.min_connections_or_default(), DEFAULT_MIN_CONNECTIONS);
        assert!(!opts.test_before_acquire_or_default());
    }

    #[test]
    fn test_pool_options_sqlite_default_max() {
        let opts = PoolOptions::default();
        assert_eq!(opts.max_connections_or_default(true), 1);
        assert_eq!(opts.max_connections_or_default(false), DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_pool_options_validation() {
        let opts = PoolOptions {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = PoolOptions {
            min_connections: Some(5),
            max_connections: Some(2),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        assert!(PoolOptions::default().validate().is_ok());
    }
}
