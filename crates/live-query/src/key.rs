//! Query keys — canonical identifiers for logical live data requests.
//!
//! A key is a named resource plus an ordered list of parameters. Identity is
//! defined by the canonical serialized form: two keys that canonicalize to
//! the same string address the same subscription target, regardless of how
//! they were constructed.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Canonical identifier for one logical live data request.
#[derive(Debug, Clone)]
pub struct QueryKey {
    resource: String,
    params: Vec<(String, Value)>,
}

impl QueryKey {
    /// A key with no parameters (e.g. "all documents of a resource").
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: Vec::new(),
        }
    }

    /// Append a named parameter. Parameter order is part of the identity.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    /// The canonical string form of this key.
    ///
    /// Built with `serde_json`, whose maps serialize with sorted keys, so
    /// nested object parameters are deterministic. Parameters are kept in
    /// the order they were added — `.with("a", 1).with("b", 2)` and
    /// `.with("b", 2).with("a", 1)` are different targets.
    pub fn canonical(&self) -> String {
        let params: Vec<Value> = self
            .params
            .iter()
            .map(|(name, value)| Value::Array(vec![Value::String(name.clone()), value.clone()]))
            .collect();
        let shape = Value::Array(vec![
            Value::String(self.resource.clone()),
            Value::Array(params),
        ]);
        // Serializing a Value cannot fail.
        serde_json::to_string(&shape).unwrap_or_else(|_| self.resource.clone())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
