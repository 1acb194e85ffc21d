//! Template engine facade.
//!
//! Two engines are available:
//!
//! - **simple** (default): [`conditionals`](super::conditionals) then
//!   [`substitute`](super::substitute). Never fails; unknown placeholders stay literal.
//! - **handlebars**: the full [Handlebars](https://handlebarsjs.com/) language
//!   (`{{#each}}`, `{{#unless}}`, helpers, inline partials). Runs non-strict so a
//!   missing variable renders empty, and with escaping disabled since the output
//!   is source code rather than HTML.
//!
//! Any other engine name falls back to the simple engine.

use std::fmt;

use handlebars::Handlebars;
use tracing::debug;

use super::conditionals::apply_conditionals;
use super::substitute::substitute;
use crate::error::{GliaFnError, Result};
use crate::variables::VariableBinding;

/// Rendering engine selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Simple,
    Handlebars,
}

impl EngineKind {
    /// Resolve an engine by name, falling back to [`EngineKind::Simple`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "simple" | "" => Self::Simple,
            "handlebars" | "hbs" => Self::Handlebars,
            other => {
                debug!("unknown template engine '{other}', using simple");
                Self::Simple
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Handlebars => "handlebars",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders template text with a variable binding.
pub struct TemplateRenderer {
    hbs: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs }
    }

    /// Render `text` with the named engine.
    pub fn render(&self, text: &str, binding: &VariableBinding, engine: EngineKind) -> Result<String> {
        match engine {
            EngineKind::Simple => Ok(render_simple(text, binding)),
            EngineKind::Handlebars => self
                .hbs
                .render_template(text, &binding.to_json())
                .map_err(|e| GliaFnError::TemplateRender(e.to_string())),
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// The simple engine: conditional blocks first, then placeholders.
pub fn render_simple(text: &str, binding: &VariableBinding) -> String {
    let kept = apply_conditionals(text, &binding.conditions());
    substitute(&kept, &binding.as_strings())
}
