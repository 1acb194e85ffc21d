//! End-to-end project creation against the on-disk template catalog.

use std::path::{Path, PathBuf};

use glia_fn_core::discovery::{FUNCTION_ID, INVOCATION_URI};
use glia_fn_core::error::GliaFnError;
use glia_fn_core::loader::TemplateLoader;
use glia_fn_core::manifest::ProjectManifest;
use glia_fn_core::project::{CreateOptions, ProjectCreator};
use glia_fn_core::registry::{TemplateKind, TemplateRegistry};
use tempfile::tempdir;

fn templates_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

fn disk_registry() -> TemplateRegistry {
    TemplateLoader::new(templates_path()).load_all().unwrap()
}

#[test]
fn test_disk_catalog_matches_builtin() {
    let disk = disk_registry();
    let builtin = TemplateRegistry::builtin().unwrap();

    let disk_names: Vec<&str> = disk.list().iter().map(|t| t.name()).collect();
    let builtin_names: Vec<&str> = builtin.list().iter().map(|t| t.name()).collect();
    assert_eq!(disk_names, builtin_names);
    assert!(disk.check().is_empty(), "{:?}", disk.check());
    assert!(TemplateLoader::new(templates_path()).validate_all().is_empty());
}

#[test]
fn test_function_with_applet_links_function_to_console() {
    let registry = disk_registry();
    let temp = tempdir().unwrap();
    let out = temp.path().join("demo");

    let options = CreateOptions {
        kind: Some(TemplateKind::Project),
        ..CreateOptions::default().with_variable("projectName", "demo")
    };
    let result = ProjectCreator::new(&registry)
        .create("function-with-applet", &out, &options)
        .unwrap();

    for file in ["function.js", "package.json", "README.md", "applet.html", "glia.project.json"] {
        assert!(out.join(file).is_file(), "{file} not written");
    }

    let manifest = ProjectManifest::load(&result.manifest_path).unwrap();
    assert_eq!(manifest, result.manifest);
    assert_eq!(manifest.name.as_deref(), Some("demo"));
    assert_eq!(manifest.components.functions.len(), 1);
    assert_eq!(manifest.applet("console").unwrap().path, "applet.html");
    assert!(manifest.namespace("store").is_some());

    assert_eq!(manifest.linkages.len(), 1);
    let linkage = &manifest.linkages[0];
    assert!(linkage.connects("demo", "console"));
    assert_eq!(linkage.placeholders.len(), 2);
    assert_eq!(linkage.placeholders["demo_ID"], FUNCTION_ID);
    assert_eq!(linkage.placeholders["demo_URI"], INVOCATION_URI);
    assert!(manifest.validate().is_empty());

    let applet = std::fs::read_to_string(out.join("applet.html")).unwrap();
    assert!(applet.contains("'${ demo_URI }'"));
}

#[test]
fn test_existing_files_are_overwritten() {
    let registry = TemplateRegistry::builtin().unwrap();
    let temp = tempdir().unwrap();
    let out = temp.path().join("svc");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("function.js"), "old").unwrap();

    let options = CreateOptions::default().with_variable("projectName", "svc");
    ProjectCreator::new(&registry)
        .create("basic-function", &out, &options)
        .unwrap();

    let source = std::fs::read_to_string(out.join("function.js")).unwrap();
    assert!(source.contains("function: 'svc'"));
}

#[test]
fn test_disk_template_overrides_builtin() {
    let temp = tempdir().unwrap();
    let dir = temp.path().join("catalog/basic-function");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("template.json"),
        r#"{
            "name": "basic-function",
            "type": "function",
            "variables": { "projectName": { "required": true } },
            "files": ["main.js"]
        }"#,
    )
    .unwrap();
    std::fs::write(dir.join("main.js"), "// custom {{projectName}}").unwrap();

    let mut registry = TemplateRegistry::builtin().unwrap();
    registry.extend(TemplateLoader::new(temp.path().join("catalog")).load_all().unwrap());

    // kv-function now inherits from the on-disk basic-function
    let resolved = registry.resolve("kv-function").unwrap();
    let paths: Vec<&str> = resolved.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["main.js", "function.js"]);

    let out = temp.path().join("custom");
    let result = ProjectCreator::new(&registry)
        .create(
            "basic-function",
            &out,
            &CreateOptions::default().with_variable("projectName", "x"),
        )
        .unwrap();
    assert_eq!(result.files, vec![out.join("main.js")]);
    assert_eq!(result.manifest.name.as_deref(), Some("custom"));
    assert!(result.manifest.components.functions.is_empty());
}

#[test]
fn test_cyclic_catalog_is_rejected() {
    let temp = tempdir().unwrap();
    for (name, parent) in [("a", "b"), ("b", "a")] {
        let dir = temp.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("template.json"),
            format!(r#"{{ "name": "{name}", "type": "function", "parent": "{parent}" }}"#),
        )
        .unwrap();
    }
    let registry = TemplateLoader::new(temp.path()).load_all().unwrap();

    let err = ProjectCreator::new(&registry)
        .create("a", &temp.path().join("out"), &CreateOptions::default())
        .unwrap_err();
    match err {
        GliaFnError::CyclicInheritance { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
        other => panic!("expected cycle, got {other:?}"),
    }
    assert!(!temp.path().join("out").exists());
    assert_eq!(registry.check().len(), 2);
}
