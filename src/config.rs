//! Configuration System
//!
//! Layered configuration for the core: built-in defaults, a user-level file,
//! application files and `APPSIGHT__`-prefixed environment variables, merged
//! with the `config` crate and validated before use.

use crate::enablement::service::validate_service_name;
use crate::error::CoreError;
use crate::logging::LoggingConfig;
use crate::session::{DEFAULT_HISTORY_CAPACITY, DEFAULT_IDLE_THRESHOLD_MS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

pub const DEFAULT_STORAGE_PREFIX: &str = "appsight";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Namespace for every persisted key
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub enablement: EnablementConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_prefix: default_storage_prefix(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            enablement: EnablementConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where the sled store lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory; the platform data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_path(&self) -> Result<PathBuf, CoreError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("", "", DEFAULT_STORAGE_PREFIX)
            .map(|dirs| dirs.data_dir().join("store"))
            .ok_or_else(|| {
                CoreError::ConfigError("Could not determine platform data directory".to_string())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle gap (ms) after which the next activity starts a new session
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,

    /// Number of sessions retained for retroactive lookups
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Save the history under `<prefix>/SessionHistory`
    #[serde(default = "default_true")]
    pub persist_history: bool,
}

fn default_idle_threshold_ms() -> u64 {
    DEFAULT_IDLE_THRESHOLD_MS
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: default_idle_threshold_ms(),
            history_capacity: default_history_capacity(),
            persist_history: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnablementConfig {
    /// Upper bound on a single store write; unbounded when unset
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,

    /// Per-service defaults used when nothing has been persisted
    #[serde(default)]
    pub defaults: HashMap<String, bool>,
}

impl EnablementConfig {
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Storage(String),
    Session(String),
    Enablement(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Session(msg) => write!(f, "Session: {}", msg),
            ValidationError::Enablement(msg) => write!(f, "Enablement: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl CoreConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage_prefix.trim().is_empty() {
            errors.push(ValidationError::Storage(
                "storage_prefix cannot be empty".to_string(),
            ));
        } else if self.storage_prefix.ends_with('/') {
            errors.push(ValidationError::Storage(format!(
                "storage_prefix '{}' must not end with '/'",
                self.storage_prefix
            )));
        }

        if self.session.idle_threshold_ms == 0 {
            errors.push(ValidationError::Session(
                "idle_threshold_ms must be greater than zero".to_string(),
            ));
        }
        if self.session.history_capacity == 0 {
            errors.push(ValidationError::Session(
                "history_capacity must be at least 1".to_string(),
            ));
        }

        if self.enablement.write_timeout_ms == Some(0) {
            errors.push(ValidationError::Enablement(
                "write_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        for name in self.enablement.defaults.keys() {
            if validate_service_name(name).is_err() {
                errors.push(ValidationError::Enablement(format!(
                    "invalid service name in defaults: {:?}",
                    name
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into a single `ConfigError`
    pub fn validated(self) -> Result<Self, CoreError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            CoreError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
