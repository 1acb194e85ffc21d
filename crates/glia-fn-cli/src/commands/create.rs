use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use dialoguer::{Confirm, Input, Select};

use glia_fn_core::fs::FileSystem;
use glia_fn_core::prereqs;
use glia_fn_core::project::{CreateOptions, CreateResult, ProjectCreator};
use glia_fn_core::registry::{ResolvedTemplate, TemplateKind, TemplateRegistry};
use glia_fn_core::templates::EngineKind;
use glia_fn_core::variables::{VarType, VarValue};

use super::Context;
use crate::output;

/// Create a project from a template.
///
/// Prompts for the template when none is given and for every required
/// variable that has neither a `--var` value nor a default. Asks before
/// writing into a non-empty directory unless `force` is set.
pub fn run(
    ctx: &Context,
    template: Option<&str>,
    output_dir: Option<&Path>,
    vars: &[(String, String)],
    kind: Option<TemplateKind>,
    engine: Option<&str>,
    force: bool,
) -> Result<()> {
    let registry = ctx.registry()?;

    let template_name = match template {
        Some(name) => name.to_string(),
        None => select_template(&registry, kind)?,
    };
    output::print_header(&format!("glia-fn create: {template_name}"));

    let resolved = registry.resolve(&template_name)?;
    output::print_step(1, 3, "Collecting variables");
    let mut variables: BTreeMap<String, VarValue> = vars
        .iter()
        .map(|(k, v)| (k.clone(), VarValue::from(v.as_str())))
        .collect();
    prompt_missing(&resolved, &mut variables)?;

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_output_dir(&variables, &template_name),
    };
    let creator = ProjectCreator::new(&registry);
    if !force && is_non_empty_dir(creator.fs(), &output_dir)? {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "{} is not empty. Existing files will be overwritten. Continue?",
                output_dir.display()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            bail!("aborted: {} is not empty", output_dir.display());
        }
    }

    output::print_step(2, 3, &format!("Rendering into {}/", output_dir.display()));
    let mut options = CreateOptions::from_config(&ctx.config);
    options.variables = variables;
    options.kind = kind;
    if let Some(engine) = engine {
        options.engine = EngineKind::from_name(engine);
    }

    let result = creator.create(&template_name, &output_dir, &options)?;
    print_result(&result);

    output::print_step(3, 3, "Checking prerequisites");
    let warnings = prereqs::check(&result.requires);
    if warnings.is_empty() {
        output::print_success("All required tools found");
    } else {
        for warning in &warnings {
            output::print_warning(&warning.to_string());
        }
    }

    output::print_success(&format!(
        "Project '{}' created from {template_name}",
        result.manifest.name.as_deref().unwrap_or(&template_name)
    ));
    println!();
    println!("  Next steps:");
    println!("    cd {}", output_dir.display());
    println!("    glia-fn show {template_name}");
    println!();

    Ok(())
}

fn select_template(registry: &TemplateRegistry, kind: Option<TemplateKind>) -> Result<String> {
    let candidates = match kind {
        Some(kind) => registry.by_kind(kind),
        None => registry.list(),
    };
    if candidates.is_empty() {
        bail!("no templates available");
    }

    let labels: Vec<String> = candidates
        .iter()
        .map(|t| {
            format!(
                "{} ({}): {}",
                t.name(),
                t.definition.kind,
                t.definition.description
            )
        })
        .collect();
    let selection = Select::new()
        .with_prompt("Select a template")
        .items(&labels[..])
        .default(0)
        .interact()?;

    Ok(candidates[selection].name().to_string())
}

fn prompt_missing(
    resolved: &ResolvedTemplate,
    variables: &mut BTreeMap<String, VarValue>,
) -> Result<()> {
    for (name, decl) in resolved.required_variables() {
        if variables.contains_key(name) || decl.default.is_some() {
            continue;
        }
        let prompt = match &decl.description {
            Some(description) => format!("{description} ({name})"),
            None => name.clone(),
        };

        let value = if let Some(allowed) = &decl.allowed {
            let selection = Select::new()
                .with_prompt(&prompt)
                .items(&allowed[..])
                .default(0)
                .interact()?;
            VarValue::from(allowed[selection].as_str())
        } else if decl.var_type == Some(VarType::Boolean) {
            VarValue::from(Confirm::new().with_prompt(&prompt).interact()?)
        } else {
            let text = Input::<String>::new().with_prompt(&prompt).interact_text()?;
            VarValue::from(text)
        };
        variables.insert(name.clone(), value);
    }
    Ok(())
}

fn default_output_dir(variables: &BTreeMap<String, VarValue>, template: &str) -> PathBuf {
    match variables.get("projectName") {
        Some(name) if !name.to_string().trim().is_empty() => PathBuf::from(name.to_string()),
        _ => PathBuf::from(template),
    }
}

/// Whether `dir` already holds files that a create could overwrite.
fn is_non_empty_dir(fs: &impl FileSystem, dir: &Path) -> Result<bool> {
    if !fs.exists(dir) {
        return Ok(false);
    }
    Ok(!fs.list(dir)?.is_empty())
}

fn print_result(result: &CreateResult) {
    for file in &result.files {
        output::print_success(&format!("Created {}", file.display()));
    }
    output::print_success(&format!("Wrote {}", result.manifest_path.display()));

    let manifest = &result.manifest;
    output::print_key_value(
        "Functions",
        &manifest
            .components
            .functions
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    if !manifest.components.applets.is_empty() {
        output::print_key_value(
            "Applets",
            &manifest
                .components
                .applets
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    if !manifest.kv_store.namespaces.is_empty() {
        output::print_key_value(
            "KV namespaces",
            &manifest
                .kv_store
                .namespaces
                .iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    for linkage in &manifest.linkages {
        output::print_key_value("Linkage", &format!("{} -> {}", linkage.from, linkage.to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glia_fn_core::fs::{MemoryFileSystem, StdFileSystem};

    #[test]
    fn test_default_output_dir() {
        let vars = BTreeMap::from([("projectName".to_string(), VarValue::from("demo"))]);
        assert_eq!(default_output_dir(&vars, "basic-function"), PathBuf::from("demo"));
        assert_eq!(
            default_output_dir(&BTreeMap::new(), "basic-function"),
            PathBuf::from("basic-function")
        );
    }

    #[test]
    fn test_is_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fs = StdFileSystem;
        assert!(!is_non_empty_dir(&fs, dir.path()).unwrap());
        assert!(!is_non_empty_dir(&fs, &dir.path().join("missing")).unwrap());
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        assert!(!is_non_empty_dir(&fs, dir.path()).unwrap());
        std::fs::write(dir.path().join("empty/f"), "x").unwrap();
        assert!(is_non_empty_dir(&fs, dir.path()).unwrap());
    }

    #[test]
    fn test_is_non_empty_dir_in_memory() {
        let fs = MemoryFileSystem::new();
        assert!(!is_non_empty_dir(&fs, Path::new("/out")).unwrap());
        fs.write(Path::new("/out/src/index.js"), "x").unwrap();
        assert!(is_non_empty_dir(&fs, Path::new("/out")).unwrap());
    }
}
