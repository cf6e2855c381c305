//! Per-resource record schemas, validated at the normalization boundary.
//!
//! - [`node`] — [`SchemaNode`] tree and the `t` builder module.
//! - [`validate`] — walking validator producing path-tracked errors.

pub mod node;
pub mod validate;

pub use node::{t, SchemaNode};
pub use validate::{validate_fields, validate_value};
