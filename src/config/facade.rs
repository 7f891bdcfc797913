//! Config loading entry points.

use std::path::Path;

use config::File;
use tracing::debug;

use super::merge::merge_policy;
use super::sources::{app_file, env, global_file};
use super::CoreConfig;
use crate::error::CoreError;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for an application rooted at `app_root`.
    pub fn load(app_root: &Path) -> Result<CoreConfig, CoreError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = app_file::add_to_builder(builder, app_root)?;
        let builder = env::add_to_builder(builder);

        let config: CoreConfig = builder.build()?.try_deserialize()?;
        debug!(app_root = %app_root.display(), prefix = %config.storage_prefix, "configuration loaded");
        config.validated()
    }

    /// Load a single file on top of the defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<CoreConfig, CoreError> {
        let config: CoreConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validated()
    }
}
