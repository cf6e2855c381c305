use std::collections::BTreeMap;

// ============================================================================
// SchemaNode Types
// ============================================================================

/// A schema node describing the shape and type constraints of a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String,
    Number,
    Boolean,
    /// ISO 8601 timestamp string.
    Date,
    Optional(Box<SchemaNode>),
    Array(Box<SchemaNode>),
    Object(BTreeMap<String, SchemaNode>),
    /// Document identifier: a non-empty string.
    Key,
}

// ============================================================================
// Schema Builder API (`t` module)
// ============================================================================

/// Schema builder helpers. Usage: `t::string()`, `t::optional(t::string())`,
/// `t::array(t::string())`, etc.
pub mod t {
    use super::SchemaNode;
    use std::collections::BTreeMap;

    pub fn string() -> SchemaNode {
        SchemaNode::String
    }

    pub fn number() -> SchemaNode {
        SchemaNode::Number
    }

    pub fn boolean() -> SchemaNode {
        SchemaNode::Boolean
    }

    pub fn date() -> SchemaNode {
        SchemaNode::Date
    }

    pub fn optional(inner: SchemaNode) -> SchemaNode {
        SchemaNode::Optional(Box::new(inner))
    }

    pub fn array(element: SchemaNode) -> SchemaNode {
        SchemaNode::Array(Box::new(element))
    }

    pub fn object(properties: BTreeMap<String, SchemaNode>) -> SchemaNode {
        SchemaNode::Object(properties)
    }

    pub fn key() -> SchemaNode {
        SchemaNode::Key
    }
}
