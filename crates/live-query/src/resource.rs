//! Resource definitions and the catalog handed to the query client.
//!
//! A [`ResourceDef`] names one document kind and carries the field schema
//! validated at the normalization boundary. The [`ResourceCatalog`] is
//! built once at process start and owned by the client; resources the
//! catalog does not know are passed through unvalidated.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use crate::schema::SchemaNode;

// ============================================================================
// Name validation
// ============================================================================

static NAME_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn name_regex() -> &'static regex::Regex {
    NAME_REGEX.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").expect("name regex is valid")
    })
}

// ============================================================================
// ResourceDef
// ============================================================================

/// Definition of one resource kind: its name and expected field shape.
#[derive(Debug, Clone)]
pub struct ResourceDef {
    pub name: String,
    pub schema: BTreeMap<String, SchemaNode>,
}

/// Builder for a [`ResourceDef`].
pub struct ResourceBuilder {
    name: String,
    schema: BTreeMap<String, SchemaNode>,
}

impl ResourceBuilder {
    /// Add a field to the schema.
    /// Panics on invalid field names — definitions are static program
    /// structure, not runtime input.
    pub fn field(mut self, name: &str, node: SchemaNode) -> Self {
        if !name_regex().is_match(name) {
            panic!(
                "Field name \"{name}\" in resource \"{}\" contains invalid characters. \
                 Field names must start with a letter or underscore and contain only \
                 alphanumeric characters, underscores, and dashes.",
                self.name
            );
        }
        if self.schema.insert(name.to_string(), node).is_some() {
            panic!(
                "Field \"{name}\" defined twice on resource \"{}\"",
                self.name
            );
        }
        self
    }

    pub fn build(self) -> ResourceDef {
        ResourceDef {
            name: self.name,
            schema: self.schema,
        }
    }
}

/// Create a new resource builder.
/// Panics if the name is empty or contains invalid characters.
pub fn resource(name: &str) -> ResourceBuilder {
    if name.trim().is_empty() {
        panic!("Resource name cannot be empty");
    }
    if !name_regex().is_match(name) {
        panic!(
            "Resource name \"{name}\" contains invalid characters. \
             Resource names must start with a letter or underscore and contain \
             only alphanumeric characters, underscores, and dashes."
        );
    }
    ResourceBuilder {
        name: name.to_string(),
        schema: BTreeMap::new(),
    }
}

// ============================================================================
// ResourceCatalog
// ============================================================================

/// The set of resource definitions known to a client instance.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    defs: HashMap<String, Arc<ResourceDef>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Panics on duplicate names — catalogs are
    /// assembled once at startup.
    pub fn register(mut self, def: ResourceDef) -> Self {
        let name = def.name.clone();
        if self.defs.insert(name.clone(), Arc::new(def)).is_some() {
            panic!("Resource \"{name}\" registered twice");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceDef>> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
