use anyhow::Result;

use glia_fn_core::variables::VariableDecl;

use super::Context;
use crate::output;

/// Show a template with its inheritance chain flattened.
pub fn run(ctx: &Context, template: &str) -> Result<()> {
    let registry = ctx.registry()?;
    let resolved = registry.resolve(template)?;

    output::print_header(&format!("{} ({})", resolved.display_name, resolved.name));
    output::print_key_value("Type", resolved.kind.as_str());
    if !resolved.description.is_empty() {
        output::print_key_value("Description", &resolved.description);
    }
    if !resolved.tags.is_empty() {
        let tags: Vec<&str> = resolved.tags.iter().map(String::as_str).collect();
        output::print_key_value("Tags", &tags.join(", "));
    }
    output::print_key_value("Lineage", &resolved.lineage.join(" -> "));
    if let Some(found) = registry.get(template) {
        output::print_key_value("Source", &found.origin.to_string());
    }

    output::print_key_value("Variables", "");
    for (name, decl) in &resolved.variables {
        output::print_item(&format!("{name}{}", describe(decl)));
    }

    output::print_key_value("Files", "");
    for file in &resolved.files {
        output::print_item(&format!("{} (from {})", file.path, file.origin));
    }

    if !resolved.requires.is_empty() {
        output::print_key_value("Requires", "");
        for req in &resolved.requires {
            match &req.minimum_version {
                Some(min) => output::print_item(&format!("{} >= {min} ({})", req.tool, req.install)),
                None => output::print_item(&format!("{} ({})", req.tool, req.install)),
            }
        }
    }

    Ok(())
}

fn describe(decl: &VariableDecl) -> String {
    let mut parts = Vec::new();
    if decl.required {
        parts.push("required".to_string());
    }
    if let Some(ty) = decl.var_type {
        parts.push(ty.to_string());
    }
    if let Some(default) = &decl.default {
        parts.push(format!("default: {default}"));
    }
    if let Some(allowed) = &decl.allowed {
        parts.push(format!("one of: {}", allowed.join(" | ")));
    }

    let mut out = String::new();
    if !parts.is_empty() {
        out.push_str(&format!(" [{}]", parts.join(", ")));
    }
    if let Some(description) = &decl.description {
        out.push_str(&format!(": {description}"));
    }
    out
}
