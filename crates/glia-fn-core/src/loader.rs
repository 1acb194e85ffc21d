//! On-disk template catalog.
//!
//! Every immediate subdirectory of the templates directory that holds a
//! `template.json` is one template. Declared files are read eagerly, relative
//! to the template directory. A directory that fails to load is skipped with a
//! warning so one broken template does not hide the rest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{GliaFnError, Result};
use crate::registry::{
    is_safe_relative, Template, TemplateDefinition, TemplateOrigin, TemplateRegistry,
};

/// Definition file expected in every template directory.
pub const DEFINITION_FILE: &str = "template.json";

pub struct TemplateLoader {
    templates_path: PathBuf,
}

impl TemplateLoader {
    pub fn new(templates_path: impl Into<PathBuf>) -> Self {
        Self {
            templates_path: templates_path.into(),
        }
    }

    /// Load every template directory. A missing templates directory gives an
    /// empty registry.
    pub fn load_all(&self) -> Result<TemplateRegistry> {
        let mut registry = TemplateRegistry::new();

        if !self.templates_path.exists() {
            warn!(
                "templates directory does not exist: {}",
                self.templates_path.display()
            );
            return Ok(registry);
        }

        for dir in self.template_dirs() {
            match self.load_template(&dir) {
                Ok(template) => {
                    info!("loaded template '{}' from {}", template.name(), dir.display());
                    registry.register(template);
                }
                Err(e) => warn!("skipping template at {}: {e}", dir.display()),
            }
        }

        Ok(registry)
    }

    /// Load the template in `dir`.
    pub fn load_template(&self, dir: &Path) -> Result<Template> {
        let definition_path = dir.join(DEFINITION_FILE);
        debug!("loading template definition {}", definition_path.display());

        let json = std::fs::read_to_string(&definition_path).map_err(|e| GliaFnError::Read {
            path: definition_path.clone(),
            source: e,
        })?;
        let definition =
            TemplateDefinition::from_json(&json).map_err(|e| GliaFnError::InvalidTemplate {
                template: dir_name(dir),
                message: e.to_string(),
            })?;

        let mut contents = BTreeMap::new();
        for file in &definition.files {
            if !is_safe_relative(file) {
                return Err(GliaFnError::InvalidTemplate {
                    template: definition.name.clone(),
                    message: format!("file path '{file}' escapes the template directory"),
                });
            }
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    contents.insert(file.clone(), content);
                }
                Err(e) => {
                    return Err(GliaFnError::InvalidTemplate {
                        template: definition.name.clone(),
                        message: format!("cannot read declared file '{file}': {e}"),
                    })
                }
            }
        }

        Template::new(definition, contents, TemplateOrigin::Directory(dir.to_path_buf()))
    }

    /// Problems with each template directory, prefixed with the directory name.
    /// Loadable templates contribute nothing.
    pub fn validate_all(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.templates_path.is_dir() {
            issues.push(format!(
                "templates directory does not exist: {}",
                self.templates_path.display()
            ));
            return issues;
        }
        for dir in self.template_dirs() {
            if let Err(e) = self.load_template(&dir) {
                issues.push(format!("{}: {e}", dir_name(&dir)));
            }
        }
        issues
    }

    fn template_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = WalkDir::new(&self.templates_path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .filter(|dir| dir.join(DEFINITION_FILE).is_file())
            .collect();
        dirs.sort();
        dirs
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
