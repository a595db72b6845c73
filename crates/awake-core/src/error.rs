//! Core error types for awake-core.
//!
//! Each collaborator the alarm core talks to (durable store, notification
//! platform, audio output, config file) gets its own error enum so callers can
//! decide per class whether to retry, warn, or ignore. `CoreError` wraps them
//! all for the places where a single type is more convenient.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for awake-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Notification platform errors
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Sound playback errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database file
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

    /// A stored value could not be encoded or decoded
    #[error("Malformed value under key '{key}': {message}")]
    Malformed { key: String, message: String },

    /// The store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Notification platform errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The platform rejected a registration, cancellation or enumeration
    #[error("Notification platform error: {0}")]
    Platform(String),

    /// The alarm carries a time that cannot exist on a clock
    #[error("Alarm time {hour}:{minute:02} is not a valid time of day")]
    InvalidTime { hour: u8, minute: u8 },
}

/// Alarm sound errors. All of them are recoverable through the haptic fallback.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No sound locator was configured
    #[error("No alarm sound configured")]
    NotConfigured,

    /// The output cannot play the given locator
    #[error("Sound source '{0}' is not supported by this output")]
    Unsupported(String),

    /// Loading or playback failed
    #[error("Playback failed: {0}")]
    Playback(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Numeric field outside its allowed range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
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
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(err: rusqlite::Error) -> Self {
        ScheduleError::Platform(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
