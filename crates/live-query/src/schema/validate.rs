use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ValidationError, ValidationErrors};

use super::node::SchemaNode;

// ============================================================================
// ISO 8601 Date Regex
// ============================================================================

/// Compiled once at first use.
fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,6})?Z?$")
            .expect("ISO date regex is valid")
    })
}

/// Validate ISO 8601 format + semantic correctness via chrono.
fn is_valid_iso_date(s: &str) -> bool {
    if !iso_date_regex().is_match(s) {
        return false;
    }
    // Normalise to RFC 3339 for chrono by appending Z when the string has
    // no explicit timezone suffix.
    let normalised = if s.ends_with('Z') {
        s.to_string()
    } else {
        format!("{s}Z")
    };
    chrono::DateTime::parse_from_rfc3339(&normalised).is_ok()
}

// ============================================================================
// Validation Context
// ============================================================================

struct ValidationContext {
    errors: Vec<ValidationError>,
    path: Vec<String>,
}

impl ValidationContext {
    fn new() -> Self {
        Self {
            errors: vec![],
            path: vec![],
        }
    }

    fn push_key(&mut self, key: impl Into<String>) {
        self.path.push(key.into());
    }

    fn push_index(&mut self, idx: usize) {
        self.path.push(format!("[{idx}]"));
    }

    fn pop(&mut self) {
        self.path.pop();
    }

    /// Join path segments, collapsing `".[0]"` → `"[0]"`.
    fn current_path(&self) -> String {
        self.path.join(".").replace(".[", "[")
    }

    fn add_error(&mut self, expected: impl Into<String>, received: impl Into<String>) {
        self.errors.push(ValidationError {
            path: self.current_path(),
            expected: expected.into(),
            received: received.into(),
        });
    }
}

// ============================================================================
// Type Name Helpers
// ============================================================================

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Core Walker
// ============================================================================

const MAX_DEPTH: usize = 100;

/// Walk the schema tree and validate `value`, collecting errors into `ctx`.
fn walk(schema: &SchemaNode, value: &Value, ctx: &mut ValidationContext, depth: usize) {
    if depth > MAX_DEPTH {
        ctx.add_error(format!("nesting depth <= {MAX_DEPTH}"), "deeper value");
        return;
    }

    match schema {
        SchemaNode::String => {
            if !value.is_string() {
                ctx.add_error("string", type_name(value));
            }
        }

        SchemaNode::Number => {
            if !value.is_number() {
                ctx.add_error("number", type_name(value));
            }
        }

        SchemaNode::Boolean => {
            if !value.is_boolean() {
                ctx.add_error("boolean", type_name(value));
            }
        }

        SchemaNode::Date => match value.as_str() {
            Some(s) if is_valid_iso_date(s) => {}
            Some(_) => ctx.add_error("ISO date string", "malformed string"),
            None => ctx.add_error("ISO date string", type_name(value)),
        },

        SchemaNode::Key => match value.as_str() {
            Some(s) if !s.is_empty() => {}
            Some(_) => ctx.add_error("non-empty string (key)", "empty string"),
            None => ctx.add_error("non-empty string (key)", type_name(value)),
        },

        SchemaNode::Optional(inner) => {
            if !value.is_null() {
                walk(inner, value, ctx, depth + 1);
            }
        }

        SchemaNode::Array(element) => match value.as_array() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    ctx.push_index(idx);
                    walk(element, item, ctx, depth + 1);
                    ctx.pop();
                }
            }
            None => ctx.add_error("array", type_name(value)),
        },

        SchemaNode::Object(properties) => match value.as_object() {
            Some(obj) => {
                // Declared fields are checked; undeclared fields pass
                // through (remote documents may carry fields this client
                // does not model).
                for (name, node) in properties {
                    ctx.push_key(name.clone());
                    match obj.get(name) {
                        Some(v) => walk(node, v, ctx, depth + 1),
                        None => {
                            if !matches!(node, SchemaNode::Optional(_)) {
                                ctx.add_error(describe(node), "missing");
                            }
                        }
                    }
                    ctx.pop();
                }
            }
            None => ctx.add_error("object", type_name(value)),
        },
    }
}

fn describe(node: &SchemaNode) -> String {
    match node {
        SchemaNode::String => "string".to_string(),
        SchemaNode::Number => "number".to_string(),
        SchemaNode::Boolean => "boolean".to_string(),
        SchemaNode::Date => "ISO date string".to_string(),
        SchemaNode::Key => "non-empty string (key)".to_string(),
        SchemaNode::Optional(inner) => format!("optional {}", describe(inner)),
        SchemaNode::Array(inner) => format!("array of {}", describe(inner)),
        SchemaNode::Object(_) => "object".to_string(),
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate `value` against a field schema (field name → node).
///
/// Missing non-optional fields, wrong types, and malformed dates are
/// collected into one `ValidationErrors` result.
pub fn validate_fields(
    schema: &BTreeMap<String, SchemaNode>,
    value: &Value,
) -> Result<(), ValidationErrors> {
    let mut ctx = ValidationContext::new();
    walk(&SchemaNode::Object(schema.clone()), value, &mut ctx, 0);
    if ctx.errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(ctx.errors))
    }
}

/// Validate a single value against one schema node.
pub fn validate_value(schema: &SchemaNode, value: &Value) -> Result<(), ValidationErrors> {
    let mut ctx = ValidationContext::new();
    walk(schema, value, &mut ctx, 0);
    if ctx.errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(ctx.errors))
    }
}
