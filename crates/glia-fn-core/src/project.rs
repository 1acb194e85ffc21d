//! Project creation from a template.
//!
//! [`ProjectCreator::create`] runs the whole pipeline:
//!
//! 1. resolve the template and its inheritance chain
//! 2. check the requested template type and validate variables
//! 3. render every file (content and path) and write it under the output directory
//! 4. render each ancestor's manifest fragment and merge them oldest first
//! 5. fill `name` and `author` when no template set them, then run discovery
//! 6. write the manifest as pretty JSON
//!
//! The first failing write aborts the run. Files already written stay on disk.
//!
//! ## Output layout
//!
//! ```text
//! <output>/
//! ├── glia.project.json   # ProjectManifest (name configurable)
//! └── ...                 # template files at their rendered relative paths
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::discovery::{discover, DiscoveryReport, RenderedFile};
use crate::error::{GliaFnError, Result, Violation};
use crate::fs::{FileSystem, StdFileSystem};
use crate::manifest::{merge_chain, ProjectManifest};
use crate::registry::{is_safe_relative, TemplateKind, TemplateRegistry, ToolRequirement};
use crate::templates::{EngineKind, TemplateRenderer};
use crate::variables::{self, VarValue, VariableBinding};

/// Default manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "glia.project.json";

/// Inputs to [`ProjectCreator::create`] besides the template and output directory.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub variables: BTreeMap<String, VarValue>,
    /// Expected template type. A mismatch fails validation on field `type`.
    pub kind: Option<TemplateKind>,
    pub engine: EngineKind,
    pub manifest_file: String,
    pub author: Option<String>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            variables: BTreeMap::new(),
            kind: None,
            engine: EngineKind::Simple,
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            author: None,
        }
    }
}

impl CreateOptions {
    pub fn from_config(config: &CliConfig) -> Self {
        Self {
            engine: config.engine_kind(),
            manifest_file: config.manifest_file.clone(),
            author: config.author.clone(),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// What a successful [`ProjectCreator::create`] produced.
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub template: String,
    /// Written template files, in write order. Excludes the manifest.
    pub files: Vec<PathBuf>,
    pub manifest: ProjectManifest,
    pub manifest_path: PathBuf,
    pub discovery: DiscoveryReport,
    /// Tools the generated project needs.
    pub requires: Vec<ToolRequirement>,
}

/// Creates projects from registry templates through a [`FileSystem`].
pub struct ProjectCreator<'r, F: FileSystem = StdFileSystem> {
    registry: &'r TemplateRegistry,
    fs: F,
    renderer: TemplateRenderer,
}

impl<'r> ProjectCreator<'r, StdFileSystem> {
    pub fn new(registry: &'r TemplateRegistry) -> Self {
        Self::with_fs(registry, StdFileSystem)
    }
}

impl<'r, F: FileSystem> ProjectCreator<'r, F> {
    pub fn with_fs(registry: &'r TemplateRegistry, fs: F) -> Self {
        Self {
            registry,
            fs,
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Create a project from `template` under `output_dir`.
    pub fn create(
        &self,
        template: &str,
        output_dir: &Path,
        options: &CreateOptions,
    ) -> Result<CreateResult> {
        let resolved = self.registry.resolve(template)?;

        let mut violations = Vec::new();
        if let Some(kind) = options.kind.filter(|kind| *kind != resolved.kind) {
            violations.push(Violation::new(
                "type",
                format!(
                    "template '{}' is a {} template, not a {kind} template",
                    resolved.name, resolved.kind
                ),
            ));
        }

        let binding = match variables::validate(&resolved.variables, &options.variables) {
            Ok(binding) if violations.is_empty() => binding,
            Ok(_) => return Err(GliaFnError::Validation { violations }),
            Err(GliaFnError::Validation { violations: more }) => {
                violations.extend(more);
                return Err(GliaFnError::Validation { violations });
            }
            Err(e) => return Err(e),
        };
        info!(
            "creating '{}' in {} with the {} engine",
            resolved.name,
            output_dir.display(),
            options.engine
        );

        let mut written = Vec::with_capacity(resolved.files.len());
        let mut rendered = Vec::with_capacity(resolved.files.len());
        for file in &resolved.files {
            let relative = self.renderer.render(&file.path, &binding, options.engine)?;
            if !is_safe_relative(&relative) {
                return Err(GliaFnError::InvalidTemplate {
                    template: file.origin.clone(),
                    message: format!("file path '{}' renders to unsafe path '{relative}'", file.path),
                });
            }

            let source = self.registry.file_content(&file.origin, &file.path)?;
            let content = self.renderer.render(source, &binding, options.engine)?;

            let target = output_dir.join(&relative);
            self.fs
                .write(&target, &content)
                .map_err(|e| GliaFnError::Write {
                    path: target.clone(),
                    source: e,
                })?;
            debug!("wrote {} (from {})", target.display(), file.origin);

            written.push(target);
            rendered.push(RenderedFile {
                path: relative,
                content,
            });
        }

        let mut manifest = self.build_manifest(&resolved.fragments, &binding, options.engine)?;
        if manifest.name.is_none() {
            manifest.name = project_name(output_dir);
        }
        if manifest.author.is_none() {
            manifest.author.clone_from(&options.author);
        }

        let discovery = discover(&mut manifest, &rendered);
        if !discovery.is_empty() {
            info!(
                "discovered {} applet(s), {} namespace(s), {} linkage(s)",
                discovery.applets.len(),
                discovery.namespaces.len(),
                discovery.linkages.len()
            );
        }
        for issue in manifest.validate() {
            warn!("manifest for '{}': {issue}", resolved.name);
        }

        let manifest_path = output_dir.join(&options.manifest_file);
        let json = manifest
            .to_json_pretty()
            .map_err(|e| GliaFnError::ManifestParse {
                path: manifest_path.clone(),
                source: e,
            })?;
        self.fs
            .write(&manifest_path, &json)
            .map_err(|e| GliaFnError::Write {
                path: manifest_path.clone(),
                source: e,
            })?;

        info!("created '{}' ({} files)", resolved.name, written.len());

        Ok(CreateResult {
            template: resolved.name,
            files: written,
            manifest,
            manifest_path,
            discovery,
            requires: resolved.requires,
        })
    }

    /// Render every fragment with `binding` and merge them, oldest first.
    fn build_manifest(
        &self,
        fragments: &[Option<ProjectManifest>],
        binding: &VariableBinding,
        engine: EngineKind,
    ) -> Result<ProjectManifest> {
        let rendered = fragments
            .iter()
            .map(|fragment| {
                fragment
                    .as_ref()
                    .map(|f| f.try_map_strings(|s| self.renderer.render(s, binding, engine)))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(merge_chain(rendered))
    }
}

fn project_name(output_dir: &Path) -> Option<String> {
    let name = output_dir.file_name().map(|n| n.to_string_lossy().into_owned());
    name.or_else(|| {
        output_dir
            .canonicalize()
            .ok()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::registry::{Template, TemplateDefinition, TemplateOrigin};

    fn builtin() -> TemplateRegistry {
        TemplateRegistry::builtin().unwrap()
    }

    fn demo_options() -> CreateOptions {
        CreateOptions::default()
            .with_variable("projectName", "demo")
            .with_variable("description", "test")
    }

    #[test]
    fn test_basic_function_manifest_has_one_function() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let out = Path::new("/work/demo");

        let result = creator.create("basic-function", out, &demo_options()).unwrap();

        assert_eq!(result.manifest.components.functions.len(), 1);
        assert_eq!(result.manifest.components.functions[0].name, "demo");
        assert_eq!(result.manifest.description.as_deref(), Some("test"));
        assert_eq!(result.manifest_path, out.join("glia.project.json"));
        assert_eq!(
            result.files,
            vec![out.join("function.js"), out.join("package.json"), out.join("README.md")]
        );

        let files = creator.fs().files();
        let manifest = ProjectManifest::from_json(&files[&out.join("glia.project.json")]).unwrap();
        assert_eq!(manifest, result.manifest);

        let source = &files[&out.join("function.js")];
        assert!(source.contains("function: 'demo'"));
        assert!(!source.contains("console.log"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_kv_function_inherits_and_discovers_namespace() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let options = demo_options().with_variable("logRequests", true);

        let result = creator
            .create("kv-function", Path::new("/work/kv"), &options)
            .unwrap();

        let function = result.manifest.function("demo").unwrap();
        assert_eq!(function.description.as_deref(), Some("test"));
        assert_eq!(function.environment.as_ref().unwrap()["KV_NAMESPACE"], "store");
        assert_eq!(result.discovery.namespaces, vec!["store"]);
        assert!(result.manifest.namespace("store").is_some());

        let source = &creator.fs().files()[Path::new("/work/kv/function.js")];
        assert!(source.contains("initializeKvStore('store')"));
        assert!(source.contains("console.log('[demo] request', body);"));
    }

    #[test]
    fn test_missing_required_variable_writes_nothing() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());

        let err = creator
            .create("basic-function", Path::new("/work/x"), &CreateOptions::default())
            .unwrap_err();

        assert_eq!(err.violated_fields(), vec!["projectName"]);
        assert!(creator.fs().files().is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let options = CreateOptions {
            kind: Some(TemplateKind::Applet),
            ..demo_options()
        };

        let err = creator
            .create("basic-function", Path::new("/work/x"), &options)
            .unwrap_err();
        assert_eq!(err.violated_fields(), vec!["type"]);
    }

    #[test]
    fn test_type_mismatch_reported_with_missing_variables() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let options = CreateOptions {
            kind: Some(TemplateKind::Applet),
            ..CreateOptions::default()
        };

        let err = creator
            .create("basic-function", Path::new("/work/x"), &options)
            .unwrap_err();

        let fields = err.violated_fields();
        assert_eq!(fields[0], "type");
        assert!(fields.contains(&"projectName"));
        assert!(creator.fs().files().is_empty());
    }

    #[test]
    fn test_write_failure_aborts_remaining_files() {
        let registry = builtin();
        let fs = MemoryFileSystem::new();
        fs.fail_writes_under("/work/demo/package.json");
        let creator = ProjectCreator::with_fs(&registry, fs);

        let err = creator
            .create("basic-function", Path::new("/work/demo"), &demo_options())
            .unwrap_err();

        match err {
            GliaFnError::Write { path, .. } => {
                assert_eq!(path, PathBuf::from("/work/demo/package.json"))
            }
            other => panic!("expected write error, got {other:?}"),
        }
        let files = creator.fs().files();
        assert!(files.contains_key(Path::new("/work/demo/function.js")));
        assert!(!files.contains_key(Path::new("/work/demo/README.md")));
        assert!(!files.contains_key(Path::new("/work/demo/glia.project.json")));
    }

    #[test]
    fn test_name_and_author_fallbacks_and_rendered_paths() {
        let definition = TemplateDefinition {
            name: "bare".into(),
            display_name: String::new(),
            description: String::new(),
            kind: TemplateKind::Function,
            tags: BTreeSet::new(),
            variables: BTreeMap::new(),
            files: vec!["src/{{projectName}}.js".into()],
            manifest_fragment: None,
            parent: None,
            requires: Vec::new(),
        };
        let contents = BTreeMap::from([(
            "src/{{projectName}}.js".to_string(),
            "// {{projectName}}".to_string(),
        )]);
        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(definition, contents, TemplateOrigin::Builtin).unwrap());

        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let options = CreateOptions {
            author: Some("Ada".into()),
            manifest_file: "project.json".into(),
            ..CreateOptions::default().with_variable("projectName", "orders")
        };
        let result = creator
            .create("bare", Path::new("/work/shop"), &options)
            .unwrap();

        assert_eq!(result.manifest.name.as_deref(), Some("shop"));
        assert_eq!(result.manifest.author.as_deref(), Some("Ada"));
        assert_eq!(result.files, vec![PathBuf::from("/work/shop/src/orders.js")]);
        assert_eq!(result.manifest_path, PathBuf::from("/work/shop/project.json"));
        assert_eq!(
            creator.fs().files()[Path::new("/work/shop/src/orders.js")],
            "// orders"
        );
    }

    #[test]
    fn test_handlebars_engine() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        let options = CreateOptions {
            engine: EngineKind::Handlebars,
            ..demo_options().with_variable("logRequests", true)
        };

        let result = creator
            .create("basic-function", Path::new("/work/hbs"), &options)
            .unwrap();

        assert_eq!(result.manifest.components.functions[0].name, "demo");
        let source = &creator.fs().files()[Path::new("/work/hbs/function.js")];
        assert!(source.contains("console.log('[demo] request', body);"));
    }

    #[test]
    fn test_unknown_template() {
        let registry = builtin();
        let creator = ProjectCreator::with_fs(&registry, MemoryFileSystem::new());
        assert!(matches!(
            creator.create("nope", Path::new("/work/x"), &demo_options()),
            Err(GliaFnError::TemplateNotFound(_))
        ));
    }
}
