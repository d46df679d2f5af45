//! Error types for resource resolution

use thiserror::Error;

/// Resource resolution errors
///
/// Absence of an entity is never an error: lookups return `Option`.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Composite key does not have the shape its resource kind expects
    #[error("Malformed resource key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    /// Policy source could not produce statements
    #[error("Policy source error: {0}")]
    PolicySource(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ResourceError {
    pub(crate) fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Storage collaborator errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Database query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Row could not be decoded.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::ConnectionError {
                    message: err.to_string(),
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::SerializationError {
                    message: err.to_string(),
                }
            }
            other => StorageError::QueryError {
                message: other.to_string(),
            },
        }
    }
}
