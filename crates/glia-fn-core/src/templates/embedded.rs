//! Compile-time embedded built-in template catalog.
//!
//! Each template lives under `templates/<name>/` at the repository root: a
//! `template.json` definition plus the files it declares. The paths below are
//! relative to this source file (`crates/glia-fn-core/src/templates/embedded.rs`).
//!
//! ## Adding a built-in template
//!
//! 1. Create `templates/<name>/template.json` and its files
//! 2. Add an [`EmbeddedTemplate`] constant here listing every declared file
//! 3. Append it to [`BUILTIN`]
//!
//! A declared file missing from the `files` table makes
//! [`TemplateRegistry::builtin`](crate::registry::TemplateRegistry::builtin) fail.

/// A template definition and its file contents, baked into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedTemplate {
    /// Contents of `template.json`.
    pub definition: &'static str,
    /// `(relative path, contents)` for every declared file.
    pub files: &'static [(&'static str, &'static str)],
}

// -------------------------------------------------------
// Functions
// -------------------------------------------------------

pub const BASIC_FUNCTION: EmbeddedTemplate = EmbeddedTemplate {
    definition: include_str!("../../../../templates/basic-function/template.json"),
    files: &[
        ("function.js", include_str!("../../../../templates/basic-function/function.js")),
        ("package.json", include_str!("../../../../templates/basic-function/package.json")),
        ("README.md", include_str!("../../../../templates/basic-function/README.md")),
    ],
};

pub const KV_FUNCTION: EmbeddedTemplate = EmbeddedTemplate {
    definition: include_str!("../../../../templates/kv-function/template.json"),
    files: &[("function.js", include_str!("../../../../templates/kv-function/function.js"))],
};

// -------------------------------------------------------
// Applets and projects
// -------------------------------------------------------

pub const BASIC_APPLET: EmbeddedTemplate = EmbeddedTemplate {
    definition: include_str!("../../../../templates/basic-applet/template.json"),
    files: &[("applet.html", include_str!("../../../../templates/basic-applet/applet.html"))],
};

pub const FUNCTION_WITH_APPLET: EmbeddedTemplate = EmbeddedTemplate {
    definition: include_str!("../../../../templates/function-with-applet/template.json"),
    files: &[(
        "applet.html",
        include_str!("../../../../templates/function-with-applet/applet.html"),
    )],
};

/// Every built-in template, parents before children.
pub const BUILTIN: &[EmbeddedTemplate] = &[
    BASIC_FUNCTION,
    KV_FUNCTION,
    BASIC_APPLET,
    FUNCTION_WITH_APPLET,
];
