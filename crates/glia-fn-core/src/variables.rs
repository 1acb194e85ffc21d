//! Template variable declarations and binding validation.
//!
//! A template declares its variables as a schema (`required`, `enum`, `type`,
//! `default`). Before any file is rendered the caller's values are checked
//! against that schema with [`validate`], which collects *every* violation
//! rather than stopping at the first, and produces a [`VariableBinding`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GliaFnError, Result, Violation};

/// Primitive type a variable must coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// A concrete variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl VarValue {
    /// Truthiness used for `{{#if name}}` blocks.
    ///
    /// Strings are true unless empty, `"false"` or `"0"`; numbers unless zero.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::Text(s) => {
                let s = s.trim();
                !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0")
            }
        }
    }

    /// Coerce to the declared type. Returns `None` when the value cannot represent it.
    pub fn coerce(&self, ty: VarType) -> Option<Self> {
        match (ty, self) {
            (VarType::String, v) => Some(Self::Text(v.to_string())),
            (VarType::Number, Self::Number(n)) => Some(Self::Number(n.clone())),
            (VarType::Number, Self::Text(s)) => parse_number(s.trim()).map(Self::Number),
            (VarType::Boolean, Self::Bool(b)) => Some(Self::Bool(*b)),
            (VarType::Boolean, Self::Text(s)) => parse_bool(s.trim()).map(Self::Bool),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

fn parse_number(s: &str) -> Option<serde_json::Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i.into());
    }
    s.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for VarValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// Declaration of one template variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<VarValue>,
    #[serde(default)]
    pub required: bool,
    /// Allowed values, compared against the value's string form.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VarType>,
}

/// Resolved variable values for a single creation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBinding {
    values: BTreeMap<String, VarValue>,
}

impl VariableBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&VarValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarValue)> {
        self.values.iter()
    }

    /// String form of every value, for placeholder substitution.
    pub fn as_strings(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Truthiness of every value, for conditional blocks.
    pub fn conditions(&self) -> BTreeMap<String, bool> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.is_truthy()))
            .collect()
    }

    /// JSON object context, for the handlebars engine.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<VarValue>> FromIterator<(K, V)> for VariableBinding {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Check `provided` against `schema` and build the binding.
///
/// Declared defaults fill absent variables, declared types are coerced, and
/// undeclared provided variables pass through unchanged. Fails with
/// [`GliaFnError::Validation`] listing every violated field.
pub fn validate(
    schema: &BTreeMap<String, VariableDecl>,
    provided: &BTreeMap<String, VarValue>,
) -> Result<VariableBinding> {
    let mut violations = Vec::new();
    let mut binding = VariableBinding::new();

    for (name, decl) in schema {
        let Some(value) = provided.get(name).or(decl.default.as_ref()) else {
            if decl.required {
                violations.push(Violation::new(name, "required variable is missing"));
            }
            continue;
        };

        if decl.required && matches!(value, VarValue::Text(s) if s.trim().is_empty()) {
            violations.push(Violation::new(name, "required variable is empty"));
            continue;
        }

        let value = match decl.var_type {
            Some(ty) => match value.coerce(ty) {
                Some(v) => v,
                None => {
                    violations.push(Violation::new(
                        name,
                        format!("expected a {ty}, got '{value}'"),
                    ));
                    continue;
                }
            },
            None => value.clone(),
        };

        if let Some(allowed) = &decl.allowed {
            let text = value.to_string();
            if !allowed.iter().any(|a| *a == text) {
                violations.push(Violation::new(
                    name,
                    format!("'{text}' is not one of: {}", allowed.join(", ")),
                ));
                continue;
            }
        }

        binding.insert(name.clone(), value);
    }

    if !violations.is_empty() {
        return Err(GliaFnError::Validation { violations });
    }

    for (name, value) in provided {
        if !schema.contains_key(name) {
            binding.insert(name.clone(), value.clone());
        }
    }

    Ok(binding)
}
