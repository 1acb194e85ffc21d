//! Unified error types for the glia-fn toolkit.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single field-level failure found while validating a variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Variable name (or `type` for a template type mismatch).
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// All errors that can occur during glia-fn operations.
#[derive(Error, Debug)]
pub enum GliaFnError {
    // --- Catalog ---

    /// The template name is not registered (directly requested or named as a parent).
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A template's parent chain revisits a template already on the chain.
    #[error("cyclic template inheritance: {}", chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    /// A template definition is malformed (bad `template.json`, missing file content, bad fragment).
    #[error("invalid template '{template}': {message}")]
    InvalidTemplate { template: String, message: String },

    // --- Creation ---

    /// The variable binding violates the template's schema. Lists every violation.
    #[error("variable validation failed: {}", join_violations(violations))]
    Validation { violations: Vec<Violation> },

    /// Writing a generated file failed. Files written before this one are left in place.
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a template or project file failed.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Handlebars template rendering failed (malformed template syntax).
    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    // --- Configuration ---

    /// The configuration file exists but could not be read.
    #[error("config file could not be read at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- Manifests ---

    /// A project manifest file was not found.
    #[error("project manifest not found at {path}")]
    ManifestNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project manifest file contains invalid JSON or an unexpected shape.
    #[error("failed to parse project manifest at {path}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GliaFnError {
    /// Field names of a validation failure, empty for every other error.
    pub fn violated_fields(&self) -> Vec<&str> {
        match self {
            Self::Validation { violations } => {
                violations.iter().map(|v| v.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Alias for `Result<T, GliaFnError>`.
pub type Result<T> = std::result::Result<T, GliaFnError>;
