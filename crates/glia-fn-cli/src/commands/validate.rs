use anyhow::{bail, Result};

use glia_fn_core::loader::TemplateLoader;

use super::Context;
use crate::output;

/// Check the template catalog: loadability of on-disk templates, parents,
/// cycles, and manifest fragments.
pub fn run(ctx: &Context) -> Result<()> {
    output::print_header("glia-fn validate");

    let mut issues = Vec::new();
    if let Some(dir) = ctx.templates_dir() {
        output::print_key_value("Templates dir", &dir.display().to_string());
        issues.extend(TemplateLoader::new(dir).validate_all());
    }

    let registry = ctx.registry()?;
    output::print_key_value("Templates", &registry.len().to_string());
    issues.extend(registry.check());

    if issues.is_empty() {
        output::print_success("Catalog is valid");
        return Ok(());
    }
    for issue in &issues {
        output::print_error(issue);
    }
    bail!("{} catalog issue(s) found", issues.len())
}
