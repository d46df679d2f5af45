//! Resolver and storage configuration
//!
//! Environment variables:
//! - `AAM_ENABLE_PREFETCH` - Build the batched cache index (default: true)
//! - `DATABASE_URL` - MySQL connection string
//! - `AAM_TABLE_PREFIX` - Table name prefix (default: wp_)
//! - `AAM_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `AAM_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 3)

use crate::error::{ResourceError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default table prefix
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Resource resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Build the cache index with one batched query before resolving.
    /// When disabled every resolution is a direct lookup.
    pub enable_prefetch: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enable_prefetch: true,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enable_prefetch: env_or("AAM_ENABLE_PREFETCH", defaults.enable_prefetch)?,
        })
    }
}

/// Names of the storage tables the batched queries read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub posts: String,
    pub terms: String,
    pub term_taxonomy: String,
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            posts: format!("{}posts", prefix),
            terms: format!("{}terms", prefix),
            term_taxonomy: format!("{}term_taxonomy", prefix),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_TABLE_PREFIX)
    }
}

/// MySQL store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlStoreConfig {
    /// MySQL connection string
    pub database_url: String,

    /// Prefix applied to every table name
    pub table_prefix: String,

    /// Maximum pool connections
    pub max_connections: u32,

    /// Pool acquire timeout
    #[serde(with = "duration_secs")]
    pub acquire_timeout: Duration,
}

impl Default for MySqlStoreConfig {
    fn default() -> Self {
        Self {
            database_url: "mysql://localhost/wordpress".to_string(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

impl MySqlStoreConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            table_prefix: std::env::var("AAM_TABLE_PREFIX").unwrap_or(defaults.table_prefix),
            max_connections: env_or("AAM_DB_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout: Duration::from_secs(env_or(
                "AAM_DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?),
        })
    }

    pub fn tables(&self) -> TableNames {
        TableNames::with_prefix(&self.table_prefix)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ResourceError::Config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_prefix() {
        let tables = TableNames::with_prefix("site2_");
        assert_eq!(tables.posts, "site2_posts");
        assert_eq!(tables.terms, "site2_terms");
        assert_eq!(tables.term_taxonomy, "site2_term_taxonomy");
        assert_eq!(TableNames::default().posts, "wp_posts");
    }

    #[test]
    fn test_resolver_config_defaults() {
        assert!(ResolverConfig::default().enable_prefetch);

        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enable_prefetch);
    }

    #[test]
    fn test_store_config_deserialize() {
        let config: MySqlStoreConfig =
            serde_json::from_str(r#"{"table_prefix": "blog_", "acquire_timeout": 10}"#).unwrap();

        assert_eq!(config.tables().terms, "blog_terms");
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.max_connections, 10);
    }
}
