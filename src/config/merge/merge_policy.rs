//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::config::DEFAULT_STORAGE_PREFIX;
use crate::session::{DEFAULT_HISTORY_CAPACITY, DEFAULT_IDLE_THRESHOLD_MS};

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key: global file, then
/// application files, then the environment.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage_prefix", DEFAULT_STORAGE_PREFIX)?
        .set_default("session.idle_threshold_ms", DEFAULT_IDLE_THRESHOLD_MS as i64)?
        .set_default("session.history_capacity", DEFAULT_HISTORY_CAPACITY as i64)?
        .set_default("session.persist_history", true)
}
