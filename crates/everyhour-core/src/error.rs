//! Core error types for everyhour-core.
//!
//! Every fallible operation in the library returns [`CoreError`] (or one of
//! the narrower enums it wraps). The coordinator turns these into failed
//! protocol responses at its boundary, so none of them is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for everyhour-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Host timer errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Request decoding errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another process
    #[error("Database is locked")]
    Locked,

    /// The store refused the operation (used by in-memory stores)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded
    #[error("Stored value for '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

/// Host timer errors.
#[derive(Error, Debug)]
pub enum TimerError {
    /// The timer backend could not be reached
    #[error("Timer service unavailable: {0}")]
    Unavailable(String),

    /// A timer was created with an unusable schedule
    #[error("Invalid timer '{name}': {message}")]
    Invalid { name: String, message: String },
}

/// Errors raised while decoding a protocol request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The `type` field names no known request
    #[error("Unknown message type: {0}")]
    UnknownKind(String),

    /// The request is not an object or carries no `type`
    #[error("Unknown message type")]
    MissingKind,

    /// A known request whose fields could not be decoded
    #[error("Malformed '{kind}' request: {message}")]
    Malformed { kind: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for TimerError {
    fn from(err: rusqlite::Error) -> Self {
        TimerError::Unavailable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
