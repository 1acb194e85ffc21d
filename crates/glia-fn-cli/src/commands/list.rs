use anyhow::Result;
use serde::Serialize;

use glia_fn_core::registry::{Template, TemplateKind};

use super::Context;
use crate::output;

/// One row of `glia-fn list --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSummary<'a> {
    name: &'a str,
    display_name: &'a str,
    #[serde(rename = "type")]
    kind: TemplateKind,
    description: &'a str,
    tags: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
    source: String,
}

impl<'a> TemplateSummary<'a> {
    fn new(template: &'a Template) -> Self {
        let def = &template.definition;
        Self {
            name: &def.name,
            display_name: def.title(),
            kind: def.kind,
            description: &def.description,
            tags: def.tags.iter().map(String::as_str).collect(),
            parent: def.parent.as_deref(),
            source: template.origin.to_string(),
        }
    }
}

/// List templates, optionally filtered by type and tag.
pub fn run(ctx: &Context, kind: Option<TemplateKind>, tag: Option<&str>, json: bool) -> Result<()> {
    let registry = ctx.registry()?;
    let templates: Vec<&Template> = registry
        .list()
        .into_iter()
        .filter(|t| kind.is_none_or(|k| t.definition.kind == k))
        .filter(|t| tag.is_none_or(|tag| t.definition.tags.contains(tag)))
        .collect();

    if json {
        let rows: Vec<TemplateSummary<'_>> = templates.iter().map(|t| TemplateSummary::new(t)).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    output::print_header("glia-fn templates");
    if templates.is_empty() {
        output::print_warning("No templates match");
        return Ok(());
    }
    for template in templates {
        let def = &template.definition;
        let mut line = format!("[{}] {}", def.kind, def.description);
        if let Some(parent) = &def.parent {
            line.push_str(&format!(" (extends {parent})"));
        }
        output::print_key_value(&def.name, &line);
    }
    Ok(())
}
