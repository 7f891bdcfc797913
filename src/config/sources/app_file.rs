//! Per-application config files under `<app_root>/config/`.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

pub const ENV_VAR: &str = "APPSIGHT_ENV";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Active environment name, from `APPSIGHT_ENV`.
pub fn environment() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// Candidate files for `app_root`, lowest precedence first: the shared
/// `config.toml`, then the file named after the active environment.
pub fn app_config_files(app_root: &Path) -> Vec<PathBuf> {
    let dir = app_root.join("config");
    vec![
        dir.join("config.toml"),
        dir.join(format!("{}.toml", environment())),
    ]
}

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    app_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for path in app_config_files(app_root) {
        if path.is_file() {
            debug!(config_path = %path.display(), "adding application configuration");
            builder = builder.add_source(File::from(path).required(false));
        }
    }
    Ok(builder)
}
