//! Project manifest model and merging.
//!
//! A project manifest (`glia.project.json`) describes the functions, applets,
//! KV-store namespaces and function→applet linkages of a generated project.
//! Templates contribute partial manifests ("fragments") that are merged
//! pairwise along the inheritance chain with [`merge`].
//!
//! ## Merge rules
//!
//! - scalars (`name`, `version`, `description`, `author`): child wins when set
//! - functions, applets, namespaces: union by `name`; on a shared name the
//!   parent entry is the base and every field the child sets overwrites it
//! - linkages: union by `(from, to)`; the first linkage for a pair wins
//!
//! Parent entries keep their order and child-only entries are appended.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GliaFnError, Result};

/// A serverless function component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionComponent {
    pub name: String,
    /// Source file, relative to the project root.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
}

/// An applet (HTML console page) component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppletComponent {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub functions: Vec<FunctionComponent>,
    #[serde(default)]
    pub applets: Vec<AppletComponent>,
}

/// A KV-store namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvNamespace {
    pub name: String,
    /// Entry time-to-live in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvStore {
    #[serde(default)]
    pub namespaces: Vec<KvNamespace>,
}

/// Directed edge from a function to an applet.
///
/// `placeholders` maps a placeholder token in the applet to the function
/// property substituted for it at deploy time (`invocationUri`, `functionId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linkage {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

impl Linkage {
    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }
}

/// The composed project's structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub kv_store: KvStore,
    #[serde(default)]
    pub linkages: Vec<Linkage>,
}

/// Entries of a manifest collection that are unique by name.
trait Named: Clone {
    fn name(&self) -> &str;

    /// Overwrite every field `child` defines.
    fn overlay(&mut self, child: &Self);
}

impl Named for FunctionComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn overlay(&mut self, child: &Self) {
        self.path.clone_from(&child.path);
        overlay_opt(&mut self.description, &child.description);
        overlay_opt(&mut self.environment, &child.environment);
    }
}

impl Named for AppletComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn overlay(&mut self, child: &Self) {
        self.path.clone_from(&child.path);
        overlay_opt(&mut self.description, &child.description);
    }
}

impl Named for KvNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn overlay(&mut self, child: &Self) {
        overlay_opt(&mut self.ttl, &child.ttl);
        overlay_opt(&mut self.description, &child.description);
    }
}

fn overlay_opt<T: Clone>(base: &mut Option<T>, child: &Option<T>) {
    if child.is_some() {
        base.clone_from(child);
    }
}

fn union_by_name<T: Named>(base: &mut Vec<T>, child: &[T]) {
    for entry in child {
        match base.iter_mut().find(|existing| existing.name() == entry.name()) {
            Some(existing) => existing.overlay(entry),
            None => base.push(entry.clone()),
        }
    }
}

fn map_opt<E>(
    value: &Option<String>,
    f: &mut dyn FnMut(&str) -> std::result::Result<String, E>,
) -> std::result::Result<Option<String>, E> {
    value.as_deref().map(f).transpose()
}

fn map_entries<E>(
    entries: &BTreeMap<String, String>,
    f: &mut dyn FnMut(&str) -> std::result::Result<String, E>,
) -> std::result::Result<BTreeMap<String, String>, E> {
    entries.iter().map(|(k, v)| Ok((f(k)?, f(v)?))).collect()
}

fn duplicate_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for name in names {
        if !seen.insert(name) && !dups.contains(&name) {
            dups.push(name);
        }
    }
    dups
}

impl ProjectManifest {
    /// Merge `child` on top of `self` (the parent).
    pub fn merged_with(mut self, child: &ProjectManifest) -> Self {
        overlay_opt(&mut self.name, &child.name);
        overlay_opt(&mut self.version, &child.version);
        overlay_opt(&mut self.description, &child.description);
        overlay_opt(&mut self.author, &child.author);

        union_by_name(&mut self.components.functions, &child.components.functions);
        union_by_name(&mut self.components.applets, &child.components.applets);
        union_by_name(&mut self.kv_store.namespaces, &child.kv_store.namespaces);

        for linkage in &child.linkages {
            self.add_linkage(linkage.clone());
        }

        self
    }

    /// Add a linkage unless one already connects the same `(from, to)` pair.
    ///
    /// Returns `false` when the linkage was dropped.
    pub fn add_linkage(&mut self, linkage: Linkage) -> bool {
        if self
            .linkages
            .iter()
            .any(|l| l.connects(&linkage.from, &linkage.to))
        {
            return false;
        }
        self.linkages.push(linkage);
        true
    }

    /// Add a namespace unless one with the same name exists.
    pub fn add_namespace(&mut self, namespace: KvNamespace) -> bool {
        if self.namespace(&namespace.name).is_some() {
            return false;
        }
        self.kv_store.namespaces.push(namespace);
        true
    }

    /// Add an applet unless one with the same name exists.
    pub fn add_applet(&mut self, applet: AppletComponent) -> bool {
        if self.applet(&applet.name).is_some() {
            return false;
        }
        self.components.applets.push(applet);
        true
    }

    pub fn function(&self, name: &str) -> Option<&FunctionComponent> {
        self.components.functions.iter().find(|f| f.name == name)
    }

    pub fn applet(&self, name: &str) -> Option<&AppletComponent> {
        self.components.applets.iter().find(|a| a.name == name)
    }

    pub fn namespace(&self, name: &str) -> Option<&KvNamespace> {
        self.kv_store.namespaces.iter().find(|n| n.name == name)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rebuild the manifest with every string (names, paths, descriptions,
    /// map keys and values) passed through `f`.
    pub fn try_map_strings<E>(
        &self,
        mut f: impl FnMut(&str) -> std::result::Result<String, E>,
    ) -> std::result::Result<Self, E> {
        let mut functions = Vec::with_capacity(self.components.functions.len());
        for func in &self.components.functions {
            functions.push(FunctionComponent {
                name: f(&func.name)?,
                path: f(&func.path)?,
                description: map_opt(&func.description, &mut f)?,
                environment: match &func.environment {
                    Some(env) => Some(map_entries(env, &mut f)?),
                    None => None,
                },
            });
        }

        let mut applets = Vec::with_capacity(self.components.applets.len());
        for applet in &self.components.applets {
            applets.push(AppletComponent {
                name: f(&applet.name)?,
                path: f(&applet.path)?,
                description: map_opt(&applet.description, &mut f)?,
            });
        }

        let mut namespaces = Vec::with_capacity(self.kv_store.namespaces.len());
        for ns in &self.kv_store.namespaces {
            namespaces.push(KvNamespace {
                name: f(&ns.name)?,
                ttl: ns.ttl,
                description: map_opt(&ns.description, &mut f)?,
            });
        }

        let mut linkages = Vec::with_capacity(self.linkages.len());
        for linkage in &self.linkages {
            linkages.push(Linkage {
                from: f(&linkage.from)?,
                to: f(&linkage.to)?,
                placeholders: map_entries(&linkage.placeholders, &mut f)?,
            });
        }

        Ok(Self {
            name: map_opt(&self.name, &mut f)?,
            version: map_opt(&self.version, &mut f)?,
            description: map_opt(&self.description, &mut f)?,
            author: map_opt(&self.author, &mut f)?,
            components: Components { functions, applets },
            kv_store: KvStore { namespaces },
            linkages,
        })
    }

    /// Invariant violations: duplicate names or linkage pairs, and linkages
    /// whose endpoints are not declared components.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for name in duplicate_names(self.components.functions.iter().map(|f| f.name.as_str())) {
            issues.push(format!("duplicate function '{name}'"));
        }
        for name in duplicate_names(self.components.applets.iter().map(|a| a.name.as_str())) {
            issues.push(format!("duplicate applet '{name}'"));
        }
        for name in duplicate_names(self.kv_store.namespaces.iter().map(|n| n.name.as_str())) {
            issues.push(format!("duplicate KV namespace '{name}'"));
        }

        let mut pairs = HashSet::new();
        for linkage in &self.linkages {
            if !pairs.insert((linkage.from.as_str(), linkage.to.as_str())) {
                issues.push(format!(
                    "duplicate linkage {} -> {}",
                    linkage.from, linkage.to
                ));
            }
            if self.function(&linkage.from).is_none() && self.applet(&linkage.from).is_none() {
                issues.push(format!(
                    "linkage source '{}' is not a declared component",
                    linkage.from
                ));
            }
            if self.function(&linkage.to).is_none() && self.applet(&linkage.to).is_none() {
                issues.push(format!(
                    "linkage target '{}' is not a declared component",
                    linkage.to
                ));
            }
        }

        issues
    }

    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| GliaFnError::ManifestNotFound {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_json(&contents).map_err(|e| GliaFnError::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty().map_err(|e| GliaFnError::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json).map_err(|e| GliaFnError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Merge a child manifest onto a parent.
///
/// An absent side is the identity: the other side is returned unchanged, and
/// two absent sides give an empty manifest. Never fails.
pub fn merge(parent: Option<ProjectManifest>, child: Option<ProjectManifest>) -> ProjectManifest {
    match (parent, child) {
        (Some(parent), Some(child)) => parent.merged_with(&child),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => ProjectManifest::default(),
    }
}

/// Merge a chain of fragments, oldest ancestor first.
pub fn merge_chain<I>(fragments: I) -> ProjectManifest
where
    I: IntoIterator<Item = Option<ProjectManifest>>,
{
    fragments
        .into_iter()
        .fold(None, |acc, fragment| match (acc, fragment) {
            (acc, None) => acc,
            (acc, fragment) => Some(merge(acc, fragment)),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, path: &str) -> FunctionComponent {
        FunctionComponent {
            name: name.into(),
            path: path.into(),
            description: None,
            environment: None,
        }
    }

    fn linkage(from: &str, to: &str, placeholders: &[(&str, &str)]) -> Linkage {
        Linkage {
            from: from.into(),
            to: to.into(),
            placeholders: placeholders
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn sample() -> ProjectManifest {
        ProjectManifest {
            name: Some("demo".into()),
            version: Some("1.0.0".into()),
            components: Components {
                functions: vec![function("f1", "f1.js")],
                applets: vec![AppletComponent {
                    name: "a1".into(),
                    path: "a1.html".into(),
                    description: None,
                }],
            },
            linkages: vec![linkage("f1", "a1", &[("X", "y")])],
            ..Default::default()
        }
    }

    #[test]
    fn test_identity() {
        let m = sample();
        assert_eq!(merge(None, Some(m.clone())), m);
        assert_eq!(merge(Some(m.clone()), None), m);
        assert_eq!(merge(None, None), ProjectManifest::default());
    }

    #[test]
    fn test_scalars_child_wins_when_defined() {
        let parent = sample();
        let child = ProjectManifest {
            version: Some("2.0.0".into()),
            author: Some("dev".into()),
            ..Default::default()
        };
        let merged = merge(Some(parent), Some(child));
        assert_eq!(merged.name.as_deref(), Some("demo"));
        assert_eq!(merged.version.as_deref(), Some("2.0.0"));
        assert_eq!(merged.author.as_deref(), Some("dev"));
    }

    #[test]
    fn test_duplicate_linkage_parent_wins() {
        let parent = sample();
        let child = ProjectManifest {
            linkages: vec![linkage("f1", "a1", &[("Z", "w")])],
            ..Default::default()
        };
        let merged = merge(Some(parent), Some(child));
        assert_eq!(merged.linkages.len(), 1);
        assert_eq!(merged.linkages[0], linkage("f1", "a1", &[("X", "y")]));
    }

    #[test]
    fn test_function_field_level_merge() {
        let mut parent_fn = function("f1", "f1.js");
        parent_fn.description = Some("parent".into());
        let parent = ProjectManifest {
            components: Components {
                functions: vec![parent_fn, function("f0", "f0.js")],
                ..Default::default()
            },
            ..Default::default()
        };

        let mut child_fn = function("f1", "src/f1.js");
        child_fn.environment = Some(BTreeMap::from([("A".to_string(), "1".to_string())]));
        let child = ProjectManifest {
            components: Components {
                functions: vec![function("f2", "f2.js"), child_fn],
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = merge(Some(parent), Some(child));
        let names: Vec<_> = merged
            .components
            .functions
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["f1", "f0", "f2"]);

        let f1 = merged.function("f1").unwrap();
        assert_eq!(f1.path, "src/f1.js");
        assert_eq!(f1.description.as_deref(), Some("parent"));
        assert_eq!(f1.environment.as_ref().unwrap()["A"], "1");
    }

    #[test]
    fn test_namespace_merge_keeps_parent_fields() {
        let parent = ProjectManifest {
            kv_store: KvStore {
                namespaces: vec![KvNamespace {
                    name: "store".into(),
                    ttl: Some(60),
                    description: Some("cache".into()),
                }],
            },
            ..Default::default()
        };
        let child = ProjectManifest {
            kv_store: KvStore {
                namespaces: vec![KvNamespace {
                    name: "store".into(),
                    ttl: Some(3600),
                    description: None,
                }],
            },
            ..Default::default()
        };
        let merged = merge(Some(parent), Some(child));
        assert_eq!(merged.kv_store.namespaces.len(), 1);
        assert_eq!(merged.kv_store.namespaces[0].ttl, Some(3600));
        assert_eq!(merged.kv_store.namespaces[0].description.as_deref(), Some("cache"));
    }

    #[test]
    fn test_scalar_associativity_on_disjoint_data() {
        let a = ProjectManifest {
            name: Some("a".into()),
            ..Default::default()
        };
        let b = ProjectManifest {
            version: Some("1.0.0".into()),
            ..Default::default()
        };
        let c = ProjectManifest {
            author: Some("c".into()),
            description: Some("desc".into()),
            ..Default::default()
        };
        let left = merge(Some(a.clone()), Some(merge(Some(b.clone()), Some(c.clone()))));
        let right = merge(Some(merge(Some(a), Some(b))), Some(c));
        assert_eq!(left.name, right.name);
        assert_eq!(left.version, right.version);
        assert_eq!(left.description, right.description);
        assert_eq!(left.author, right.author);
    }

    #[test]
    fn test_merge_chain_skips_absent_fragments() {
        let merged = merge_chain([None, Some(sample()), None]);
        assert_eq!(merged, sample());
        assert!(merge_chain(Vec::new()).is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "name": "demo",
            "components": { "functions": [ { "name": "demo", "path": "function.js" } ] },
            "kvStore": { "namespaces": [ { "name": "store", "ttl": 60 } ] },
            "linkages": [ { "from": "demo", "to": "console", "placeholders": { "DEMO_URI": "invocationUri" } } ]
        }"#;
        let m = ProjectManifest::from_json(json).unwrap();
        assert_eq!(m.components.functions.len(), 1);
        assert_eq!(m.namespace("store").unwrap().ttl, Some(60));

        let value: serde_json::Value = serde_json::from_str(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["kvStore"]["namespaces"][0]["name"], "store");
        assert!(value.get("version").is_none());
    }

    #[test]
    fn test_try_map_strings() {
        let m = sample();
        let upper = m
            .try_map_strings(|s| Ok::<_, ()>(s.to_uppercase()))
            .unwrap();
        assert_eq!(upper.name.as_deref(), Some("DEMO"));
        assert_eq!(upper.components.functions[0].path, "F1.JS");
        assert_eq!(upper.linkages[0].placeholders["X"], "Y");
    }

    #[test]
    fn test_validate_reports_duplicates_and_dangling_linkages() {
        let mut m = sample();
        m.components.functions.push(function("f1", "other.js"));
        m.linkages.push(linkage("f1", "a1", &[]));
        m.linkages.push(linkage("ghost", "a1", &[]));
        let issues = m.validate();
        assert!(issues.iter().any(|i| i.contains("duplicate function 'f1'")));
        assert!(issues.iter().any(|i| i.contains("duplicate linkage f1 -> a1")));
        assert!(issues.iter().any(|i| i.contains("'ghost'")));
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/glia.project.json");
        sample().save(&path).unwrap();
        assert_eq!(ProjectManifest::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_nonexistent() {
        let result = ProjectManifest::load(Path::new("/tmp/nonexistent_glia_fn_manifest.json"));
        assert!(matches!(result, Err(GliaFnError::ManifestNotFound { .. })));
    }
}
