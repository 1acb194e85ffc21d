//! Component discovery over rendered project files.
//!
//! After the merged manifest is built, the rendered files are scanned to fill
//! in what templates leave implicit:
//!
//! - `.html`/`.htm` files not yet declared become applets named after their stem
//! - function sources calling `initializeKvStore("ns")` get a KV namespace
//! - applets referencing `${FUNCTION_URI}` or `${FUNCTION_ID}` get a linkage
//!   from that function
//!
//! Discovery only adds. Existing applets, namespaces and `(from, to)` linkage
//! pairs are never overwritten.

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::manifest::{AppletComponent, KvNamespace, Linkage, ProjectManifest};

/// Function property bound to a `${NAME_URI}` placeholder.
pub const INVOCATION_URI: &str = "invocationUri";

/// Function property bound to a `${NAME_ID}` placeholder.
pub const FUNCTION_ID: &str = "functionId";

static KV_INIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"initializeKvStore\(\s*(?:['"]([A-Za-z0-9_.\-]+)['"])?\s*\)"#)
        .expect("KV initializer pattern is valid")
});

static APPLET_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z][A-Za-z0-9_\-]*)\s*\}").expect("applet token pattern is valid")
});

/// A file as written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the project root.
    pub path: String,
    pub content: String,
}

/// What discovery added to the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub applets: Vec<String>,
    pub namespaces: Vec<String>,
    /// `(from, to)` pairs.
    pub linkages: Vec<(String, String)>,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.applets.is_empty() && self.namespaces.is_empty() && self.linkages.is_empty()
    }
}

/// Augment `manifest` with components found in `files`.
pub fn discover(manifest: &mut ProjectManifest, files: &[RenderedFile]) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();

    for file in files.iter().filter(|f| is_html(&f.path)) {
        let declared = manifest
            .components
            .applets
            .iter()
            .any(|a| same_path(&a.path, &file.path));
        if declared {
            continue;
        }
        let Some(stem) = Path::new(&file.path).file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let applet = AppletComponent {
            name: stem.to_string(),
            path: file.path.clone(),
            description: None,
        };
        if manifest.add_applet(applet) {
            debug!("discovered applet '{stem}' at {}", file.path);
            report.applets.push(stem.to_string());
        }
    }

    let functions = manifest.components.functions.clone();
    for function in &functions {
        let Some(source) = find_file(files, &function.path) else {
            continue;
        };
        for namespace in kv_namespaces(&source.content, &function.name) {
            let added = manifest.add_namespace(KvNamespace {
                name: namespace.clone(),
                ttl: None,
                description: Some(format!("Used by {}", function.name)),
            });
            if added {
                debug!("discovered KV namespace '{namespace}' in {}", function.path);
                report.namespaces.push(namespace);
            }
        }
    }

    let applets = manifest.components.applets.clone();
    for applet in &applets {
        let Some(page) = find_file(files, &applet.path) else {
            continue;
        };
        let tokens = applet_tokens(&page.content);
        for function in &functions {
            let placeholders: BTreeMap<String, String> = tokens
                .iter()
                .filter_map(|token| {
                    function_property(&function.name, token)
                        .map(|property| (token.clone(), property.to_string()))
                })
                .collect();
            if placeholders.is_empty() {
                continue;
            }
            let added = manifest.add_linkage(Linkage {
                from: function.name.clone(),
                to: applet.name.clone(),
                placeholders,
            });
            if added {
                debug!("discovered linkage {} -> {}", function.name, applet.name);
                report
                    .linkages
                    .push((function.name.clone(), applet.name.clone()));
            }
        }
    }

    report
}

/// Namespaces a function source initializes, in order of appearance.
///
/// A bare `initializeKvStore()` yields `function_name`.
pub fn kv_namespaces(source: &str, function_name: &str) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::new();
    for caps in KV_INIT.captures_iter(source) {
        let name = caps
            .get(1)
            .map_or(function_name, |m| m.as_str())
            .to_string();
        if !namespaces.contains(&name) {
            namespaces.push(name);
        }
    }
    namespaces
}

/// Distinct `${TOKEN}` names in an applet, in order of appearance.
pub fn applet_tokens(page: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for caps in APPLET_TOKEN.captures_iter(page) {
        let token = caps[1].to_string();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// The function property `token` stands for, if it refers to `function_name`.
pub fn function_property(function_name: &str, token: &str) -> Option<&'static str> {
    let token = normalize(token);
    let base = normalize(function_name);
    let suffix = token.strip_prefix(&base)?;
    match suffix {
        "_URI" => Some(INVOCATION_URI),
        "_ID" => Some(FUNCTION_ID),
        _ => None,
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn is_html(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

fn same_path(a: &str, b: &str) -> bool {
    let parts = |p: &str| -> Vec<String> {
        Path::new(p)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect()
    };
    parts(a) == parts(b)
}

fn find_file<'f>(files: &'f [RenderedFile], path: &str) -> Option<&'f RenderedFile> {
    files.iter().find(|f| same_path(&f.path, path))
}
