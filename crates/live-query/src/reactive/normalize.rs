//! Normalization: raw backing-store responses → the cached snapshot shape.
//!
//! A multi-document response becomes an ordered sequence of id+fields
//! records; a single-document response becomes one such record, or the
//! explicit absence value when the document does not exist.

use crate::error::NormalizeError;
use crate::resource::ResourceDef;
use crate::schema::validate_fields;
use crate::types::{DocRecord, Snapshot, StoreResponse};

/// Convert a raw store response into a [`Snapshot`].
pub fn normalize(response: StoreResponse) -> Snapshot {
    match response {
        StoreResponse::Documents(docs) => Snapshot::Many(
            docs.into_iter()
                .map(|d| DocRecord::new(d.id, d.fields))
                .collect(),
        ),
        StoreResponse::Document { id, fields } => {
            Snapshot::One(fields.map(|f| DocRecord::new(id, f)))
        }
    }
}

/// Normalize and, when a resource definition is supplied, validate each
/// record's fields against the resource schema.
///
/// Absence is never a validation subject — a missing single document
/// normalizes to `Snapshot::One(None)` without touching the schema.
pub fn normalize_checked(
    response: StoreResponse,
    def: Option<&ResourceDef>,
) -> Result<Snapshot, NormalizeError> {
    let snapshot = normalize(response);
    let def = match def {
        Some(def) => def,
        None => return Ok(snapshot),
    };

    let check = |record: &DocRecord| -> Result<(), NormalizeError> {
        if record.id.is_empty() {
            return Err(NormalizeError::EmptyId(def.name.clone()));
        }
        validate_fields(&def.schema, &serde_json::Value::Object(record.fields.clone()))?;
        Ok(())
    };

    match &snapshot {
        Snapshot::One(Some(record)) => check(record)?,
        Snapshot::One(None) => {}
        Snapshot::Many(records) => {
            for record in records {
                check(record)?;
            }
        }
    }
    Ok(snapshot)
}
