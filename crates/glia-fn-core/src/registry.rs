//! Template catalog and inheritance resolution.
//!
//! A [`TemplateRegistry`] holds template definitions together with the
//! contents of the files they declare. [`TemplateRegistry::resolve`] flattens a
//! template's `parent` chain into a [`ResolvedTemplate`]:
//!
//! - variables: child declarations replace parent declarations of the same name
//! - files: parent order is kept, a child file with the same path replaces the
//!   parent's content in place, child-only files are appended
//! - manifest fragments: kept per ancestor, oldest first, for [`crate::manifest::merge_chain`]
//!
//! The walk is iterative with a visited set, so a cyclic catalog fails with
//! [`GliaFnError::CyclicInheritance`] instead of looping.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GliaFnError, Result};
use crate::manifest::{merge_chain, ProjectManifest};
use crate::templates::embedded;
use crate::templates::substitute::placeholders;
use crate::variables::VariableDecl;

/// What a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Function,
    Project,
    Applet,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Project => "project",
            Self::Applet => "applet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "function" => Some(Self::Function),
            "project" => Some(Self::Project),
            "applet" => Some(Self::Applet),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external tool a generated project needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRequirement {
    pub tool: String,
    /// Where to get it.
    pub install: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
}

/// Contents of a `template.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableDecl>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Partial project manifest contributed by this template.
    #[serde(default, rename = "manifest", skip_serializing_if = "Option::is_none")]
    pub manifest_fragment: Option<ProjectManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub requires: Vec<ToolRequirement>,
}

impl TemplateDefinition {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Display name, falling back to the template name.
    pub fn title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Where a template was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Builtin,
    Directory(PathBuf),
}

impl fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("built-in"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// A template definition with the contents of its declared files.
#[derive(Debug, Clone)]
pub struct Template {
    pub definition: TemplateDefinition,
    pub origin: TemplateOrigin,
    contents: BTreeMap<String, String>,
}

impl Template {
    /// Build a template, checking that every declared file is a safe relative
    /// path and has content.
    pub fn new(
        definition: TemplateDefinition,
        contents: BTreeMap<String, String>,
        origin: TemplateOrigin,
    ) -> Result<Self> {
        for file in &definition.files {
            if !is_safe_relative(file) {
                return Err(GliaFnError::InvalidTemplate {
                    template: definition.name.clone(),
                    message: format!("file path '{file}' must be relative and stay inside the project"),
                });
            }
            if !contents.contains_key(file) {
                return Err(GliaFnError::InvalidTemplate {
                    template: definition.name.clone(),
                    message: format!("declared file '{file}' has no content"),
                });
            }
        }
        Ok(Self {
            definition,
            origin,
            contents,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.contents.get(path).map(String::as_str)
    }
}

pub(crate) fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A template file after inheritance: its path and the template supplying its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: String,
    pub origin: String,
}

/// A template with its inheritance chain flattened.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub kind: TemplateKind,
    pub tags: BTreeSet<String>,
    pub requires: Vec<ToolRequirement>,
    pub variables: BTreeMap<String, VariableDecl>,
    pub files: Vec<ResolvedFile>,
    /// Template names, oldest ancestor first, ending with this template.
    pub lineage: Vec<String>,
    /// Each lineage entry's manifest fragment, aligned with `lineage`.
    pub fragments: Vec<Option<ProjectManifest>>,
}

impl ResolvedTemplate {
    pub fn required_variables(&self) -> impl Iterator<Item = (&String, &VariableDecl)> {
        self.variables.iter().filter(|(_, decl)| decl.required)
    }
}

/// Registry of available templates, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the templates compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for embedded in embedded::BUILTIN {
            let definition = TemplateDefinition::from_json(embedded.definition).map_err(|e| {
                GliaFnError::InvalidTemplate {
                    template: "<built-in>".into(),
                    message: e.to_string(),
                }
            })?;
            let contents = embedded
                .files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect();
            registry.register(Template::new(definition, contents, TemplateOrigin::Builtin)?);
        }
        Ok(registry)
    }

    /// Register a template, returning the one it replaced.
    pub fn register(&mut self, template: Template) -> Option<Template> {
        debug!("registering template '{}' ({})", template.name(), template.origin);
        self.templates.insert(template.name().to_string(), template)
    }

    /// Layer `other` on top: its templates replace same-named ones.
    pub fn extend(&mut self, other: TemplateRegistry) {
        for (_, template) in other.templates {
            self.register(template);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// All templates, sorted by name.
    pub fn list(&self) -> Vec<&Template> {
        self.templates.values().collect()
    }

    pub fn by_kind(&self, kind: TemplateKind) -> Vec<&Template> {
        self.templates
            .values()
            .filter(|t| t.definition.kind == kind)
            .collect()
    }

    pub fn with_tag(&self, tag: &str) -> Vec<&Template> {
        self.templates
            .values()
            .filter(|t| t.definition.tags.contains(tag))
            .collect()
    }

    /// Content of `path` as supplied by template `template`.
    pub fn file_content(&self, template: &str, path: &str) -> Result<&str> {
        let owner = self
            .get(template)
            .ok_or_else(|| GliaFnError::TemplateNotFound(template.to_string()))?;
        owner.content(path).ok_or_else(|| GliaFnError::InvalidTemplate {
            template: template.to_string(),
            message: format!("no content for file '{path}'"),
        })
    }

    /// Resolve `name` and flatten its inheritance chain.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        let mut chain: Vec<&Template> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = name;

        loop {
            if !visited.insert(current) {
                let mut names: Vec<String> =
                    chain.iter().map(|t| t.name().to_string()).collect();
                names.push(current.to_string());
                return Err(GliaFnError::CyclicInheritance { chain: names });
            }
            let template = self
                .get(current)
                .ok_or_else(|| GliaFnError::TemplateNotFound(current.to_string()))?;
            chain.push(template);
            match template.definition.parent.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        chain.reverse();

        let mut variables = BTreeMap::new();
        let mut files: Vec<ResolvedFile> = Vec::new();
        for template in &chain {
            for (var, decl) in &template.definition.variables {
                variables.insert(var.clone(), decl.clone());
            }
            for path in &template.definition.files {
                match files.iter_mut().find(|f| f.path == *path) {
                    Some(existing) => existing.origin = template.name().to_string(),
                    None => files.push(ResolvedFile {
                        path: path.clone(),
                        origin: template.name().to_string(),
                    }),
                }
            }
        }

        // `chain` always holds at least the requested template
        let leaf = &chain[chain.len() - 1].definition;
        debug!(
            "resolved template '{}' through {} ancestor(s)",
            leaf.name,
            chain.len() - 1
        );

        Ok(ResolvedTemplate {
            name: leaf.name.clone(),
            display_name: leaf.title().to_string(),
            description: leaf.description.clone(),
            kind: leaf.kind,
            tags: leaf.tags.clone(),
            requires: leaf.requires.clone(),
            variables,
            files,
            lineage: chain.iter().map(|t| t.name().to_string()).collect(),
            fragments: chain
                .iter()
                .map(|t| t.definition.manifest_fragment.clone())
                .collect(),
        })
    }

    /// Catalog problems: unresolvable parents, cycles, files without content or
    /// using undeclared variables, and merged fragments that break manifest
    /// invariants. Each issue is prefixed with the template name.
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for name in self.templates.keys() {
            match self.resolve(name) {
                Ok(resolved) => {
                    for file in &resolved.files {
                        let Some(content) = self.get(&file.origin).and_then(|t| t.content(&file.path))
                        else {
                            issues.push(format!("{name}: no content for file '{}'", file.path));
                            continue;
                        };
                        for var in placeholders(content) {
                            if !resolved.variables.contains_key(&var) {
                                issues.push(format!(
                                    "{name}: file '{}' uses undeclared variable '{var}'",
                                    file.path
                                ));
                            }
                        }
                    }
                    let merged = merge_chain(resolved.fragments);
                    for issue in merged.validate() {
                        issues.push(format!("{name}: manifest fragment: {issue}"));
                    }
                }
                Err(e) => issues.push(format!("{name}: {e}")),
            }
        }
        issues
    }
}
