//! CLI command implementations for glia-fn.
//!
//! Each module corresponds to a subcommand (`glia-fn <command>`).

pub mod create;
pub mod list;
pub mod merge;
pub mod show;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use glia_fn_core::config::CliConfig;
use glia_fn_core::loader::TemplateLoader;
use glia_fn_core::registry::TemplateRegistry;
use tracing::debug;

/// Settings shared by every command.
pub struct Context {
    pub config: CliConfig,
    templates_dir: Option<PathBuf>,
}

impl Context {
    /// `templates_override` (from `--templates`) wins over the config file.
    pub fn new(config: CliConfig, templates_override: Option<PathBuf>) -> Self {
        let templates_dir = templates_override.or_else(|| config.templates_dir.clone());
        Self {
            config,
            templates_dir,
        }
    }

    pub fn templates_dir(&self) -> Option<&Path> {
        self.templates_dir.as_deref()
    }

    /// Built-in templates with the on-disk catalog, if any, layered on top.
    pub fn registry(&self) -> Result<TemplateRegistry> {
        let mut registry = TemplateRegistry::builtin()?;
        if let Some(dir) = self.templates_dir() {
            debug!("loading templates from {}", dir.display());
            registry.extend(TemplateLoader::new(dir).load_all()?);
        }
        Ok(registry)
    }
}
