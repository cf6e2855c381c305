use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Records and snapshots
// ============================================================================

/// One document as seen by consumers: the store identifier merged with the
/// document's field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl DocRecord {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Shorthand field accessor.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// The most recently observed value for a query key.
///
/// Absence is representable: `One(None)` means the single document the key
/// addresses does not exist. That is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Snapshot {
    /// A single-document observation.
    One(Option<DocRecord>),
    /// An ordered multi-document observation.
    Many(Vec<DocRecord>),
}

impl Snapshot {
    /// True when the snapshot observed an absent single document.
    pub fn is_absent(&self) -> bool {
        matches!(self, Snapshot::One(None))
    }

    /// The single record, if this is a present single-document snapshot.
    pub fn record(&self) -> Option<&DocRecord> {
        match self {
            Snapshot::One(r) => r.as_ref(),
            Snapshot::Many(_) => None,
        }
    }

    /// The record sequence, if this is a multi-document snapshot.
    pub fn records(&self) -> Option<&[DocRecord]> {
        match self {
            Snapshot::One(_) => None,
            Snapshot::Many(rs) => Some(rs),
        }
    }
}

// ============================================================================
// Raw store responses (pre-normalization)
// ============================================================================

/// One raw document delivered by the backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// A raw backing-store response for one observation: either the current
/// matches of a multi-document query, or a single document read where
/// `fields: None` is the store's "does not exist" signal.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResponse {
    Documents(Vec<StoreDocument>),
    Document {
        id: String,
        fields: Option<Map<String, Value>>,
    },
}

impl StoreResponse {
    /// The consistent boolean "exists" signal for single-document reads.
    /// Multi-document responses always exist (possibly as an empty set).
    pub fn exists(&self) -> bool {
        match self {
            StoreResponse::Documents(_) => true,
            StoreResponse::Document { fields, .. } => fields.is_some(),
        }
    }
}

// ============================================================================
// Consumer-facing query state
// ============================================================================

/// The hook-like state a UI consumer reads for a query key.
///
/// The three conditions callers must distinguish:
///   - loading: `is_loading == true`, no error
///   - absent:  `data == Some(Snapshot::One(None))`
///   - error:   `error == Some(..)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryState {
    pub is_loading: bool,
    pub data: Option<Snapshot>,
    pub error: Option<String>,
}

impl QueryState {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            data: None,
            error: None,
        }
    }
}

/// Notification payload delivered synchronously to per-key listeners.
#[derive(Debug, Clone)]
pub enum QueryUpdate {
    /// A new snapshot was applied to the cache.
    Snapshot(Snapshot),
    /// The cached entry was invalidated (post-initial failure or an
    /// explicit invalidation); `error` carries the failure message if any.
    Invalidated { error: Option<String> },
}

// ============================================================================
// Tests
// ============================================================================
