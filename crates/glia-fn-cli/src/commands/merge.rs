use std::path::Path;

use anyhow::Result;

use glia_fn_core::manifest::{self, ProjectManifest};

use crate::output;

/// Merge `child` over `parent` and print or write the result.
pub fn run(parent: &Path, child: &Path, output_path: Option<&Path>) -> Result<()> {
    let parent_manifest = ProjectManifest::load(parent)?;
    let child_manifest = ProjectManifest::load(child)?;
    let merged = manifest::merge(Some(parent_manifest), Some(child_manifest));

    let issues = merged.validate();

    match output_path {
        Some(path) => {
            output::print_header("glia-fn merge");
            for issue in &issues {
                output::print_warning(issue);
            }
            merged.save(path)?;
            output::print_success(&format!("Wrote {}", path.display()));
        }
        None => {
            for issue in &issues {
                tracing::warn!("merged manifest: {issue}");
            }
            print!("{}", merged.to_json_pretty()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_files() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("parent.json");
        let child = dir.path().join("child.json");
        let out = dir.path().join("merged.json");
        std::fs::write(
            &parent,
            r#"{ "name": "base", "components": { "functions": [ { "name": "f", "path": "f.js" } ] } }"#,
        )
        .unwrap();
        std::fs::write(&child, r#"{ "version": "2.0.0" }"#).unwrap();

        run(&parent, &child, Some(&out)).unwrap();

        let merged = ProjectManifest::load(&out).unwrap();
        assert_eq!(merged.name.as_deref(), Some("base"));
        assert_eq!(merged.version.as_deref(), Some("2.0.0"));
        assert_eq!(merged.components.functions.len(), 1);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(run(&missing, &missing, None).is_err());
    }
}
