//! KeyedEmitter<T> — per-key typed pub/sub.
//!
//! Listeners are stored as `Arc<dyn Fn(&T)>` so emit snapshots are cheap.
//! Snapshot-on-emit semantics:
//!   - A listener removed *during* emission is still called in that round.
//!   - A listener added *during* emission is NOT called until the next emit.
//!
//! All methods take `&self` (interior mutability via `parking_lot::Mutex`);
//! the lock is released before any callback runs, so listeners may call
//! `on()`/`off()` from inside a callback without deadlocking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A listener ID returned by [`KeyedEmitter::on`], passed to
/// [`KeyedEmitter::off`] to remove the listener.
pub type ListenerId = u64;

/// Closure type for listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

/// Typed synchronous per-key emitter.
pub struct KeyedEmitter<T> {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Arc<ListenerFn<T>>)>>>,
    next_id: AtomicU64,
}

impl<T> KeyedEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` under `key` and return its [`ListenerId`].
    pub fn on(&self, key: &str, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(key.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove the listener identified by `id` from `key`.
    ///
    /// Does nothing if `id` is not present (safe to call multiple times).
    pub fn off(&self, key: &str, id: ListenerId) {
        let mut listeners = self.listeners.lock();
        if let Some(list) = listeners.get_mut(key) {
            list.retain(|(lid, _)| *lid != id);
            if list.is_empty() {
                listeners.remove(key);
            }
        }
    }

    /// Emit `event` to all listeners currently registered under `key`.
    ///
    /// The listener list is snapshotted under the lock and the lock is
    /// released before any callback runs.
    pub fn emit(&self, key: &str, event: &T) {
        let snapshot: Vec<Arc<ListenerFn<T>>> = {
            let listeners = self.listeners.lock();
            match listeners.get(key) {
                Some(list) => list.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };
        for cb in snapshot {
            cb(event);
        }
    }

    /// Number of listeners currently registered under `key`.
    pub fn count(&self, key: &str) -> usize {
        self.listeners.lock().get(key).map_or(0, Vec::len)
    }
}

impl<T> Default for KeyedEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
