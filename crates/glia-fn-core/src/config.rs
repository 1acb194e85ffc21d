//! CLI configuration (`glia-fn.config.json`).
//!
//! ```json
//! {
//!   "templatesDir": "./my-templates",
//!   "engine": "handlebars",
//!   "manifestFile": "glia.project.json",
//!   "author": "Ada"
//! }
//! ```
//!
//! Every field is optional. A missing file means all defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GliaFnError, Result};
use crate::project::DEFAULT_MANIFEST_FILE;
use crate::templates::EngineKind;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "glia-fn.config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// On-disk template catalog, layered over the built-in templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// Template engine name (`simple` or `handlebars`).
    #[serde(default = "default_engine")]
    pub engine: String,
    /// File name of the generated project manifest.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    /// Fills the manifest `author` when no template sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn default_engine() -> String {
    EngineKind::Simple.as_str().to_string()
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            engine: default_engine(),
            manifest_file: default_manifest_file(),
            author: None,
        }
    }
}

impl CliConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GliaFnError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| GliaFnError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// [`load`](Self::load), or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| GliaFnError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| GliaFnError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn engine_kind(&self) -> EngineKind {
        EngineKind::from_name(&self.engine)
    }
}
