//! In-process [`DocumentStore`] with synchronous push delivery.
//!
//! Documents live in per-resource maps; every committed write recomputes
//! the response for each watcher of the touched resource and delivers it
//! before the write call returns. The store lock is never held while an
//! observer runs, so observers may freely re-enter the store (including
//! closing their own handle).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::trace;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::query::run_query;
use crate::types::{StoreDocument, StoreResponse};

use super::traits::{DocumentStore, WatchHandle, WatchObserver, WatchTarget, SERVER_TIMESTAMP};

// ============================================================================
// Internal state
// ============================================================================

struct Watcher {
    target: WatchTarget,
    observer: WatchObserver,
}

struct StoreInner {
    /// resource → id → fields. BTreeMaps keep unordered scans stable.
    resources: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    /// Registered live connections, in registration order.
    watchers: BTreeMap<u64, Watcher>,
    next_watcher: u64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            resources: HashMap::new(),
            watchers: BTreeMap::new(),
            next_watcher: 1,
        }
    }

    fn docs(&self, resource: &str) -> Vec<StoreDocument> {
        self.resources
            .get(resource)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| StoreDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Compute the current response for a watch target.
    fn response_for(&self, target: &WatchTarget) -> StoreResponse {
        match target {
            WatchTarget::Doc { resource, id } => StoreResponse::Document {
                id: id.clone(),
                fields: self
                    .resources
                    .get(resource)
                    .and_then(|docs| docs.get(id))
                    .cloned(),
            },
            WatchTarget::Query { resource, query } => {
                StoreResponse::Documents(run_query(self.docs(resource), query))
            }
        }
    }

    /// Collect (observer, response) pairs for every watcher of `resource`.
    fn notifications_for(&self, resource: &str) -> Vec<(WatchObserver, StoreResponse)> {
        self.watchers
            .values()
            .filter(|w| w.target.resource() == resource)
            .map(|w| (Arc::clone(&w.observer), self.response_for(&w.target)))
            .collect()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory document store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::new())),
        }
    }

    /// Number of open live connections (for diagnostics and tests).
    pub fn watcher_count(&self) -> usize {
        self.inner.lock().watchers.len()
    }

    /// Commit a mutation, then push fresh responses to every watcher of
    /// the resource. The lock is released before any observer runs.
    fn commit<F>(&self, resource: &str, mutate: F)
    where
        F: FnOnce(&mut BTreeMap<String, Map<String, Value>>),
    {
        let notifications = {
            let mut inner = self.inner.lock();
            mutate(inner.resources.entry(resource.to_string()).or_default());
            inner.notifications_for(resource)
        };
        for (observer, response) in notifications {
            observer(Ok(response));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace server-timestamp sentinels with the current wall clock.
fn resolve_server_timestamps(fields: &mut Map<String, Value>) {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    for value in fields.values_mut() {
        if value.as_str() == Some(SERVER_TIMESTAMP) {
            *value = Value::String(now.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn watch(
        &self,
        target: &WatchTarget,
        observer: WatchObserver,
    ) -> Result<Box<dyn WatchHandle>, StoreError> {
        let (id, initial) = {
            let mut inner = self.inner.lock();
            let id = inner.next_watcher;
            inner.next_watcher += 1;
            inner.watchers.insert(
                id,
                Watcher {
                    target: target.clone(),
                    observer: Arc::clone(&observer),
                },
            );
            (id, inner.response_for(target))
        };
        trace!("memory store: watcher {id} opened on {target}");

        // Initial snapshot, delivered outside the lock.
        observer(Ok(initial));

        Ok(Box::new(MemoryWatchHandle {
            inner: Arc::downgrade(&self.inner),
            id,
            closed: AtomicBool::new(false),
        }))
    }

    async fn get(&self, resource: &str, id: &str) -> Result<StoreResponse, StoreError> {
        let inner = self.inner.lock();
        Ok(StoreResponse::Document {
            id: id.to_string(),
            fields: inner
                .resources
                .get(resource)
                .and_then(|docs| docs.get(id))
                .cloned(),
        })
    }

    async fn create(
        &self,
        resource: &str,
        mut fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        resolve_server_timestamps(&mut fields);
        let id = uuid::Uuid::new_v4().to_string();
        let doc_id = id.clone();
        self.commit(resource, move |docs| {
            docs.insert(doc_id, fields);
        });
        Ok(id)
    }

    async fn set(
        &self,
        resource: &str,
        id: &str,
        mut fields: Map<String, Value>,
        merge: bool,
    ) -> Result<(), StoreError> {
        resolve_server_timestamps(&mut fields);
        let id = id.to_string();
        self.commit(resource, move |docs| {
            if merge {
                let entry = docs.entry(id).or_default();
                for (k, v) in fields {
                    entry.insert(k, v);
                }
            } else {
                docs.insert(id, fields);
            }
        });
        Ok(())
    }

    async fn update(
        &self,
        resource: &str,
        id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        resolve_server_timestamps(&mut fields);
        // Existence check happens inside the commit lock; the error is
        // carried out through this slot.
        let mut missing = false;
        {
            let notifications = {
                let mut inner = self.inner.lock();
                let docs = inner.resources.entry(resource.to_string()).or_default();
                match docs.get_mut(id) {
                    Some(existing) => {
                        for (k, v) in fields {
                            existing.insert(k, v);
                        }
                    }
                    None => missing = true,
                }
                if missing {
                    Vec::new()
                } else {
                    inner.notifications_for(resource)
                }
            };
            for (observer, response) in notifications {
                observer(Ok(response));
            }
        }
        if missing {
            return Err(StoreError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.commit(resource, move |docs| {
            docs.remove(&id);
        });
        Ok(())
    }
}

// ============================================================================
// Watch handle
// ============================================================================

struct MemoryWatchHandle {
    inner: Weak<Mutex<StoreInner>>,
    id: u64,
    closed: AtomicBool,
}

impl WatchHandle for MemoryWatchHandle {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().watchers.remove(&self.id);
            trace!("memory store: watcher {} closed", self.id);
        }
    }
}
