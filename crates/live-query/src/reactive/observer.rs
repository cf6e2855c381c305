//! QueryObserver — the consumer-side binding.
//!
//! One observer represents one UI consumer of a query key. Constructing it
//! registers the consumer with the client; dropping it unregisters, which
//! may tear down the key's live connection when no other consumer remains.
//! A UI binding layer translates `on_change` callbacks into re-render
//! triggers.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::key::QueryKey;
use crate::types::QueryState;

use super::client::QueryClient;
use super::emitter::ListenerId;

pub struct QueryObserver {
    client: Arc<QueryClient>,
    key: QueryKey,
    listeners: Mutex<Vec<ListenerId>>,
}

impl QueryObserver {
    /// Start observing `key`. Counts as one consumer registration.
    pub fn new(client: &Arc<QueryClient>, key: QueryKey) -> Self {
        client.add_consumer(&key);
        Self {
            client: Arc::clone(client),
            key,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The current `{ is_loading, data, error }` state for the key.
    pub fn state(&self) -> QueryState {
        self.client.state(&self.key)
    }

    /// Register a callback invoked synchronously with the fresh state on
    /// every update for the key. Returns the listener id; the listener is
    /// removed automatically when the observer is dropped.
    pub fn on_change(
        &self,
        callback: impl Fn(&QueryState) + Send + Sync + 'static,
    ) -> ListenerId {
        let client = Arc::clone(&self.client);
        let key = self.key.clone();
        let id = self.client.listen(&self.key, move |_update| {
            callback(&client.state(&key));
        });
        self.listeners.lock().push(id);
        id
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        for id in self.listeners.lock().drain(..) {
            self.client.unlisten(&self.key, id);
        }
        self.client.remove_consumer(&self.key);
    }
}
