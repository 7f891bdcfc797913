//! Error types for the session attribution and service enablement core.

use std::time::Duration;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid stored value for key {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Errors surfaced by the session tracker and the enablement ledger
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Out-of-order session start: offset {start_offset} precedes last recorded start {last_offset}")]
    OutOfOrderSession { start_offset: u64, last_offset: u64 },

    #[error("Session already recorded: {0}")]
    DuplicateSession(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StorageError),

    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

pub(crate) fn io_other(context: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, err),
    ))
}
