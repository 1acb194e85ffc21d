//! `{{variable}}` placeholder substitution.
//!
//! Unknown placeholders are left exactly as written so a partially rendered
//! file still shows which variables were never supplied.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace every `{{name}}` whose key exists in `variables`.
///
/// Substituted values are not scanned again.
pub fn substitute(text: &str, variables: &BTreeMap<String, String>) -> String {
    if text.is_empty() || variables.is_empty() {
        return text.to_string();
    }

    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Names of all placeholders in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
