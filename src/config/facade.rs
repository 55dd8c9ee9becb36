//! Config loading facade over the layered sources.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::BulkConfig;
use crate::error::BulkError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds a [`BulkConfig`] from every configured source
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    workspace_root: PathBuf,
    global_path: Option<PathBuf>,
    env_name: String,
    environment: bool,
}

impl ConfigLoader {
    /// Loader with the standard sources for `workspace_root`
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            global_path: global_file::global_config_path(),
            env_name: workspace_file::env_name(),
            environment: true,
        }
    }

    /// Replace (or drop, with `None`) the global config file
    pub fn global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    pub fn env_name(mut self, name: impl Into<String>) -> Self {
        self.env_name = name.into();
        self
    }

    /// Skip `SHOPIFY_BULK__*` variables
    pub fn without_environment(mut self) -> Self {
        self.environment = false;
        self
    }

    /// Load with the standard sources
    pub fn load(workspace_root: &Path) -> Result<BulkConfig, BulkError> {
        Self::new(workspace_root).build()
    }

    /// Defaults plus a single explicit file; the file must exist
    pub fn load_from_file(path: &Path) -> Result<BulkConfig, BulkError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Built-in defaults only
    pub fn default() -> BulkConfig {
        BulkConfig::default()
    }

    pub fn build(&self) -> Result<BulkConfig, BulkError> {
        // Step 1: defaults
        let builder = merge_policy::builder_with_defaults()?;

        // Step 2: global file
        let builder = global_file::add_to_builder(builder, self.global_path.as_deref())?;

        // Step 3: workspace files
        let builder =
            workspace_file::add_to_builder(builder, &self.workspace_root, &self.env_name)?;

        // Step 4: environment overrides
        let builder = if self.environment {
            environment::add_to_builder(builder)?
        } else {
            builder
        };

        let config: BulkConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace_root = %self.workspace_root.display(),
            env = %self.env_name,
            "Configuration loaded"
        );
        Ok(config)
    }
}
