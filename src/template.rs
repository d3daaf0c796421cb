//! URL template binding
//!
//! Handles `{{ .Params.Field }}` and `{{ .Input.Field }}` placeholders in
//! collector URL templates, e.g.
//! `rest/api/1.0/projects/{{ .Params.FullName }}/commits?until={{ .Input.Branch }}`.

use crate::error::{Error, Result};
use crate::types::{CollectionParams, SeedInput};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching placeholders: {{ .Root.Field }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\.([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Values a template is bound against
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Collection params (`.Params`)
    pub params: Value,
    /// Current seed (`.Input`)
    pub input: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one seed of a run
    pub fn for_seed(params: &CollectionParams, input: Option<&SeedInput>) -> Result<Self> {
        Ok(Self {
            params: serde_json::to_value(params)?,
            input: input.map(SeedInput::to_value).unwrap_or(Value::Null),
        })
    }

    /// Get a value by path (e.g., "Params.FullName")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();
        let root = match parts.first()? {
            &"Params" => &self.params,
            &"Input" => &self.input,
            _ => return None,
        };

        if parts.len() == 1 {
            Some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut errors = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) if !value.is_null() => value_to_string(value),
            _ => {
                errors.push(format!(".{var_path}"));
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains placeholders
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all placeholder paths from a template (without the leading dot)
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Whether a template binds any `.Input` field
pub fn uses_input(template: &str) -> bool {
    extract_variables(template)
        .iter()
        .any(|v| v == "Input" || v.starts_with("Input."))
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
