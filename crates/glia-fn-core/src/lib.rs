//! Core library for the glia-fn toolkit.
//!
//! Turns templates into serverless-function projects: a [`registry::TemplateRegistry`]
//! resolves template inheritance, [`templates::TemplateRenderer`] renders files
//! with a variable binding, [`manifest`] merges the project manifest fragments,
//! and [`project::ProjectCreator`] ties these together and writes the result
//! through a [`fs::FileSystem`].
//!
//! Templates come from the built-in catalog ([`templates::embedded`]) and
//! optionally from a directory on disk ([`loader::TemplateLoader`]).

pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod loader;
pub mod manifest;
pub mod prereqs;
pub mod project;
pub mod registry;
pub mod templates;
pub mod variables;
