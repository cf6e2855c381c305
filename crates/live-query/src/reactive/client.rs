//! QueryClient — the reactive query layer.
//!
//! Owns the subscription registry (canonical key → live connection +
//! epoch + consumer count), the shared result cache, and the per-key
//! listener set. Constructed once at process start and shared behind an
//! `Arc`.
//!
//! # Locking model
//!
//! Two locks: `state` (registry, refcounts, first-snapshot waiters) and
//! `cache`. `state` may be acquired before `cache`, never the reverse,
//! and neither is ever held while a connection is closed, a waiter is
//! resolved, or a listener runs.
//!
//! # Lifecycle
//!
//! A connection for a key goes unopened → open → closed, and is closed
//! exactly once: either when the consumer count for its key reaches zero,
//! or when a newer subscribe for the same key replaces it. Events from a
//! replaced connection carry a stale epoch and are discarded.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{LiveQueryError, StoreError, SubscribeError};
use crate::key::QueryKey;
use crate::resource::ResourceCatalog;
use crate::store::{WatchHandle, WatchObserver};
use crate::types::{QueryState, QueryUpdate, Snapshot, StoreResponse};

use super::emitter::{KeyedEmitter, ListenerId};
use super::normalize::normalize_checked;

// ============================================================================
// Internal state
// ============================================================================

/// Why a pending first-snapshot wait ended without a snapshot.
#[derive(Debug, Clone)]
enum WaitFailure {
    /// The first observation failed with this message.
    Initial(String),
    /// The connection was replaced before its first snapshot.
    Superseded,
    /// The last consumer went away before the first snapshot.
    Closed,
}

type WaitSender = oneshot::Sender<Result<Snapshot, WaitFailure>>;
type WaitReceiver = oneshot::Receiver<Result<Snapshot, WaitFailure>>;

struct SubscriptionEntry {
    epoch: u64,
    /// `None` while the opening call has not returned the handle yet.
    handle: Option<Box<dyn WatchHandle>>,
    /// True once the first snapshot (or first error) has been observed.
    resolved: bool,
}

struct ClientState {
    subs: HashMap<String, SubscriptionEntry>,
    refcounts: HashMap<String, usize>,
    /// Callers parked in `fetch` until the current connection's first
    /// snapshot arrives.
    waiters: HashMap<String, Vec<WaitSender>>,
    next_epoch: u64,
}

impl ClientState {
    fn new() -> Self {
        Self {
            subs: HashMap::new(),
            refcounts: HashMap::new(),
            waiters: HashMap::new(),
            next_epoch: 1,
        }
    }
}

/// Cached result for one key.
#[derive(Clone)]
enum CacheEntry {
    /// The latest successfully observed snapshot.
    Ready(Snapshot),
    /// The entry was invalidated; `last` is kept for stale rendering
    /// while a re-fetch is pending.
    Invalidated {
        last: Option<Snapshot>,
        error: Option<String>,
    },
    /// The first observation failed; no snapshot was ever cached.
    Failed(String),
}

// ============================================================================
// QueryClient
// ============================================================================

pub struct QueryClient {
    catalog: Arc<ResourceCatalog>,
    state: Arc<Mutex<ClientState>>,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
    emitter: Arc<KeyedEmitter<QueryUpdate>>,
}

impl QueryClient {
    /// Create a client over a resource catalog. Keys whose resource is in
    /// the catalog have every snapshot schema-validated at normalization.
    pub fn new(catalog: ResourceCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            state: Arc::new(Mutex::new(ClientState::new())),
            cache: Arc::new(Mutex::new(HashMap::new())),
            emitter: Arc::new(KeyedEmitter::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Subscribe
    // -----------------------------------------------------------------------

    /// Open a live connection for `key` and wait for its first snapshot.
    ///
    /// If the key already has a connection, the existing one is closed
    /// first and only the new connection's snapshots populate the cache
    /// from then on. Later snapshots from the new connection update the
    /// shared cache directly and notify listeners; they never touch the
    /// result returned here.
    ///
    /// `open` is handed the observer to wire into the store and must
    /// return the connection's close handle.
    pub async fn subscribe<F>(&self, key: &QueryKey, open: F) -> Result<Snapshot, LiveQueryError>
    where
        F: FnOnce(WatchObserver) -> Result<Box<dyn WatchHandle>, StoreError>,
    {
        let canonical = key.canonical();
        let (tx, rx) = oneshot::channel();

        // Install the new registry entry, displacing any previous one.
        let (epoch, old_handle) = {
            let mut st = self.state.lock();
            let epoch = st.next_epoch;
            st.next_epoch += 1;
            let prev = st.subs.insert(
                canonical.clone(),
                SubscriptionEntry {
                    epoch,
                    handle: None,
                    resolved: false,
                },
            );
            (epoch, prev.and_then(|e| e.handle))
        };
        if let Some(handle) = old_handle {
            debug!("replacing live connection for {canonical}");
            handle.close();
        }

        let observer = self.make_observer(key.clone(), canonical.clone(), epoch, tx);
        match open(observer) {
            Ok(handle) => {
                // The entry may have been displaced or torn down while the
                // connection was opening; a handle that is no longer
                // current is closed immediately so nothing leaks.
                let stale = {
                    let mut st = self.state.lock();
                    match st.subs.get_mut(&canonical) {
                        Some(entry) if entry.epoch == epoch => {
                            entry.handle = Some(handle);
                            None
                        }
                        _ => Some(handle),
                    }
                };
                // A displaced handle is closed here; if it delivered its
                // first snapshot before being displaced, `rx` below still
                // resolves with that snapshot.
                if let Some(handle) = stale {
                    debug!("closing superseded connection for {canonical}");
                    handle.close();
                }
            }
            Err(err) => {
                let message = err.to_string();
                {
                    let mut st = self.state.lock();
                    if st.subs.get(&canonical).is_some_and(|e| e.epoch == epoch) {
                        st.subs.remove(&canonical);
                        self.cache
                            .lock()
                            .insert(canonical.clone(), CacheEntry::Failed(message));
                    }
                }
                return Err(err.into());
            }
        }

        match rx.await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(failure)) => Err(Self::wait_failure_error(&canonical, failure)),
            // The observer (and with it the pending sender) was dropped
            // when the connection closed before any observation.
            Err(_) => Err(SubscribeError::Superseded(canonical).into()),
        }
    }

    /// Deduplicating entry point used by consumers.
    ///
    /// - fresh cached snapshot with a live connection → returned as-is;
    /// - live connection still waiting for its first snapshot → parks
    ///   until that shared snapshot arrives (no second connection);
    /// - anything else (no connection, invalidated or failed entry) →
    ///   opens via [`subscribe`].
    pub async fn fetch<F>(&self, key: &QueryKey, open: F) -> Result<Snapshot, LiveQueryError>
    where
        F: FnOnce(WatchObserver) -> Result<Box<dyn WatchHandle>, StoreError>,
    {
        let canonical = key.canonical();
        enum Plan {
            Cached(Snapshot),
            Wait(WaitReceiver),
            Open,
        }

        let plan = {
            let mut st = self.state.lock();
            match st.subs.get(&canonical) {
                Some(entry) if !entry.resolved => {
                    let (tx, rx) = oneshot::channel();
                    st.waiters.entry(canonical.clone()).or_default().push(tx);
                    Plan::Wait(rx)
                }
                Some(_) => match self.cache.lock().get(&canonical) {
                    Some(CacheEntry::Ready(snapshot)) => Plan::Cached(snapshot.clone()),
                    _ => Plan::Open,
                },
                None => Plan::Open,
            }
        };

        match plan {
            Plan::Cached(snapshot) => Ok(snapshot),
            Plan::Open => self.subscribe(key, open).await,
            Plan::Wait(rx) => match rx.await {
                Ok(Ok(snapshot)) => Ok(snapshot),
                Ok(Err(failure)) => Err(Self::wait_failure_error(&canonical, failure)),
                Err(_) => Err(SubscribeError::Closed(canonical).into()),
            },
        }
    }

    fn wait_failure_error(canonical: &str, failure: WaitFailure) -> LiveQueryError {
        match failure {
            WaitFailure::Initial(message) => SubscribeError::InitialSnapshot {
                key: canonical.to_string(),
                message,
            }
            .into(),
            WaitFailure::Superseded => SubscribeError::Superseded(canonical.to_string()).into(),
            WaitFailure::Closed => SubscribeError::Closed(canonical.to_string()).into(),
        }
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    /// Build the observer for a connection at `epoch`. Every delivery is
    /// epoch-checked against the registry so a replaced or torn-down
    /// connection can never write the cache.
    fn make_observer(
        &self,
        key: QueryKey,
        canonical: String,
        epoch: u64,
        first: WaitSender,
    ) -> WatchObserver {
        let catalog = Arc::clone(&self.catalog);
        let state = Arc::clone(&self.state);
        let cache = Arc::clone(&self.cache);
        let emitter = Arc::clone(&self.emitter);
        let pending: Mutex<Option<WaitSender>> = Mutex::new(Some(first));

        Arc::new(move |event: Result<StoreResponse, StoreError>| {
            // Normalization is pure; do it before taking any lock.
            let normalized = match event {
                Ok(response) => {
                    let def = catalog.get(key.resource()).map(Arc::as_ref);
                    normalize_checked(response, def).map_err(|e| e.to_string())
                }
                Err(err) => Err(err.to_string()),
            };

            let mut resolve: Vec<WaitSender> = Vec::new();
            let mut resolution: Option<Result<Snapshot, WaitFailure>> = None;
            let mut close_handle: Option<Box<dyn WatchHandle>> = None;
            let mut notify: Option<QueryUpdate> = None;

            {
                let mut st = state.lock();
                let was_resolved = match st.subs.get(&canonical) {
                    Some(entry) if entry.epoch == epoch => entry.resolved,
                    _ => {
                        // Stale delivery from a superseded connection.
                        drop(st);
                        trace!("discarding stale snapshot for {canonical}");
                        if let Some(tx) = pending.lock().take() {
                            let _ = tx.send(Err(WaitFailure::Superseded));
                        }
                        return;
                    }
                };

                match normalized {
                    Ok(snapshot) => {
                        if let Some(entry) = st.subs.get_mut(&canonical) {
                            entry.resolved = true;
                        }
                        cache
                            .lock()
                            .insert(canonical.clone(), CacheEntry::Ready(snapshot.clone()));
                        if !was_resolved {
                            resolve = st.waiters.remove(&canonical).unwrap_or_default();
                            resolution = Some(Ok(snapshot.clone()));
                        }
                        notify = Some(QueryUpdate::Snapshot(snapshot));
                    }
                    Err(message) => {
                        if !was_resolved {
                            // First observation failed: reject the caller,
                            // tear the connection down, record the failure.
                            let removed = st.subs.remove(&canonical);
                            close_handle = removed.and_then(|e| e.handle);
                            resolve = st.waiters.remove(&canonical).unwrap_or_default();
                            resolution = Some(Err(WaitFailure::Initial(message.clone())));
                            cache
                                .lock()
                                .insert(canonical.clone(), CacheEntry::Failed(message.clone()));
                            notify = Some(QueryUpdate::Invalidated {
                                error: Some(message),
                            });
                        } else {
                            // Post-initial failure: the already-resolved
                            // result stays resolved; invalidate so
                            // dependent consumers re-fetch.
                            debug!("invalidating {canonical}: {message}");
                            let mut cache = cache.lock();
                            let last = match cache.get(&canonical) {
                                Some(CacheEntry::Ready(s)) => Some(s.clone()),
                                Some(CacheEntry::Invalidated { last, .. }) => last.clone(),
                                _ => None,
                            };
                            cache.insert(
                                canonical.clone(),
                                CacheEntry::Invalidated {
                                    last,
                                    error: Some(message.clone()),
                                },
                            );
                            notify = Some(QueryUpdate::Invalidated {
                                error: Some(message),
                            });
                        }
                    }
                }
            }

            // All locks released: resolve waiters, close, notify.
            if let Some(result) = resolution {
                if let Some(tx) = pending.lock().take() {
                    let _ = tx.send(result.clone());
                }
                for tx in resolve {
                    let _ = tx.send(result.clone());
                }
            }
            if let Some(handle) = close_handle {
                handle.close();
            }
            if let Some(update) = notify {
                Self::emit_update(&emitter, &canonical, &update);
            }
        })
    }

    /// Emit to listeners, isolating panics so a misbehaving listener
    /// cannot poison the delivery path.
    fn emit_update(emitter: &KeyedEmitter<QueryUpdate>, canonical: &str, update: &QueryUpdate) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            emitter.emit(canonical, update);
        }));
    }

    // -----------------------------------------------------------------------
    // Consumer registration
    // -----------------------------------------------------------------------

    /// Record that a consumer started observing `key`.
    pub fn add_consumer(&self, key: &QueryKey) {
        let canonical = key.canonical();
        let mut st = self.state.lock();
        *st.refcounts.entry(canonical).or_insert(0) += 1;
    }

    /// Record that a consumer stopped observing `key`. When the count
    /// reaches zero the live connection is closed and the registry entry
    /// removed, so a future subscribe for the key starts fresh. The
    /// cached snapshot is retained for stale rendering on remount.
    pub fn remove_consumer(&self, key: &QueryKey) {
        let canonical = key.canonical();
        let (handle, waiters) = {
            let mut st = self.state.lock();
            match st.refcounts.get_mut(&canonical) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    return;
                }
                Some(_) => {
                    st.refcounts.remove(&canonical);
                }
                None => {
                    warn!("remove_consumer without matching add_consumer for {canonical}");
                    return;
                }
            }
            let handle = st.subs.remove(&canonical).and_then(|e| e.handle);
            let waiters = st.waiters.remove(&canonical).unwrap_or_default();
            (handle, waiters)
        };
        for tx in waiters {
            let _ = tx.send(Err(WaitFailure::Closed));
        }
        if let Some(handle) = handle {
            debug!("last consumer gone, closing live connection for {canonical}");
            handle.close();
        }
    }

    /// Current consumer count for a key.
    pub fn consumer_count(&self, key: &QueryKey) -> usize {
        self.state
            .lock()
            .refcounts
            .get(&key.canonical())
            .copied()
            .unwrap_or(0)
    }

    /// Whether a live connection is currently registered for `key`.
    pub fn has_connection(&self, key: &QueryKey) -> bool {
        self.state.lock().subs.contains_key(&key.canonical())
    }

    // -----------------------------------------------------------------------
    // Cache access
    // -----------------------------------------------------------------------

    /// The latest cached snapshot for `key`, if one is fresh.
    pub fn cached(&self, key: &QueryKey) -> Option<Snapshot> {
        match self.cache.lock().get(&key.canonical()) {
            Some(CacheEntry::Ready(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }

    /// The consumer-facing state for `key`: loading / data / error.
    pub fn state(&self, key: &QueryKey) -> QueryState {
        match self.cache.lock().get(&key.canonical()) {
            None => QueryState::loading(),
            Some(CacheEntry::Ready(snapshot)) => QueryState {
                is_loading: false,
                data: Some(snapshot.clone()),
                error: None,
            },
            Some(CacheEntry::Invalidated { last, error }) => QueryState {
                is_loading: true,
                data: last.clone(),
                error: error.clone(),
            },
            Some(CacheEntry::Failed(message)) => QueryState {
                is_loading: false,
                data: None,
                error: Some(message.clone()),
            },
        }
    }

    /// Invalidate the cached entry for `key`, keeping the last snapshot
    /// for stale rendering. Listeners are notified synchronously.
    pub fn invalidate(&self, key: &QueryKey) {
        let canonical = key.canonical();
        {
            let mut cache = self.cache.lock();
            let last = match cache.get(&canonical) {
                Some(CacheEntry::Ready(s)) => Some(s.clone()),
                Some(CacheEntry::Invalidated { last, .. }) => last.clone(),
                _ => None,
            };
            cache.insert(canonical.clone(), CacheEntry::Invalidated { last, error: None });
        }
        Self::emit_update(
            &self.emitter,
            &canonical,
            &QueryUpdate::Invalidated { error: None },
        );
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a listener invoked synchronously on every update for `key`.
    pub fn listen(
        &self,
        key: &QueryKey,
        callback: impl Fn(&QueryUpdate) + Send + Sync + 'static,
    ) -> ListenerId {
        self.emitter.on(&key.canonical(), callback)
    }

    /// Remove a listener previously registered with [`listen`].
    pub fn unlisten(&self, key: &QueryKey, id: ListenerId) {
        self.emitter.off(&key.canonical(), id);
    }

    /// Number of listeners for a key (for diagnostics and tests).
    pub fn listener_count(&self, key: &QueryKey) -> usize {
        self.emitter.count(&key.canonical())
    }
}
