//! The backing store boundary.
//!
//! [`DocumentStore`] is the collaborator contract this layer depends on:
//! open a live connection to a named resource (initial snapshot plus push
//! updates), perform one-shot CRUD against documents addressed by
//! identifier, and report a consistent "exists" signal on single reads.
//! Transport and protocol are owned by implementations, not specified here.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::query::StoreQuery;
use crate::types::StoreResponse;

// ============================================================================
// Watch targets
// ============================================================================

/// What a live connection observes: a single document or a filtered query.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchTarget {
    Doc { resource: String, id: String },
    Query { resource: String, query: StoreQuery },
}

impl WatchTarget {
    pub fn doc(resource: impl Into<String>, id: impl Into<String>) -> Self {
        WatchTarget::Doc {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn query(resource: impl Into<String>, query: StoreQuery) -> Self {
        WatchTarget::Query {
            resource: resource.into(),
            query,
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            WatchTarget::Doc { resource, .. } => resource,
            WatchTarget::Query { resource, .. } => resource,
        }
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchTarget::Doc { resource, id } => write!(f, "{resource}/{id}"),
            WatchTarget::Query { resource, .. } => write!(f, "{resource}?query"),
        }
    }
}

// ============================================================================
// Live connections
// ============================================================================

/// Callback receiving each observation of a live connection: the initial
/// snapshot on registration, then one call per push update. Errors after
/// registration arrive through the same channel.
pub type WatchObserver = Arc<dyn Fn(Result<StoreResponse, StoreError>) + Send + Sync>;

/// An open live connection.
///
/// `close` releases the underlying connection and must be idempotent:
/// closing an already-closed handle is a no-op. It must be safe to call
/// from teardown paths (including a consumer's drop).
pub trait WatchHandle: Send + Sync {
    fn close(&self);
}

// ============================================================================
// DocumentStore
// ============================================================================

/// The backing document store.
///
/// Implementors must be `Send + Sync` so the handle can be shared across
/// tasks. `watch` registers synchronously (the initial snapshot and any
/// registration failure are delivered through the observer); one-shot
/// operations are async.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live connection to `target`. The observer receives the
    /// initial snapshot and every subsequent push until the returned
    /// handle is closed.
    fn watch(
        &self,
        target: &WatchTarget,
        observer: WatchObserver,
    ) -> Result<Box<dyn WatchHandle>, StoreError>;

    /// Read one document. `StoreResponse::Document { fields: None }`
    /// signals that the document does not exist.
    async fn get(&self, resource: &str, id: &str) -> Result<StoreResponse, StoreError>;

    /// Create a document with a store-generated identifier. Returns the id.
    async fn create(
        &self,
        resource: &str,
        fields: Map<String, Value>,
    ) -> Result<String, StoreError>;

    /// Write a document at a known identifier. With `merge`, existing
    /// fields not present in `fields` are kept; without it the document is
    /// replaced.
    async fn set(
        &self,
        resource: &str,
        id: &str,
        fields: Map<String, Value>,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Update fields of an existing document. Fails with
    /// [`StoreError::NotFound`] when the document does not exist.
    async fn update(
        &self,
        resource: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is a no-op.
    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Server timestamp sentinel
// ============================================================================

/// Sentinel value a write may carry in place of a timestamp; the store
/// replaces it with its own clock at commit time.
pub const SERVER_TIMESTAMP: &str = "$serverTimestamp";

/// The sentinel as a JSON value, for use in write field maps.
pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}
