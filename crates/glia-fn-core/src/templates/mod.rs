//! Template rendering for project scaffolding.
//!
//! Built-in templates are embedded into the binary at compile time via
//! [`include_str!`] in the [`embedded`] module; on-disk catalogs are read by
//! [`crate::loader`]. Text is rendered by [`renderer::TemplateRenderer`].
//!
//! ## Template syntax (simple engine)
//!
//! - `{{name}}`: replaced with the variable's value; left as-is when unbound
//! - `{{#if name}}…{{/if}}`: kept when `name` is truthy, removed otherwise
//!
//! Selecting the `handlebars` engine gives the full Handlebars language instead.

pub mod conditionals;
pub mod embedded;
pub mod renderer;
pub mod substitute;

pub use conditionals::apply_conditionals;
pub use renderer::{EngineKind, TemplateRenderer};
pub use substitute::substitute;
