//! Tests for `QueryObserver` — the consumer-side binding.

use std::sync::{Arc, Mutex};

use live_query::key::QueryKey;
use live_query::platform::Platform;
use live_query::reactive::QueryObserver;
use live_query::store::{DocumentStore, MemoryStore};
use live_query::types::QueryState;
use serde_json::{json, Map, Value};

fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn observer_counts_as_a_consumer_until_dropped() {
    let platform = Platform::new(Arc::new(MemoryStore::new()));
    let key = QueryKey::new("users").with("uid", "u1");

    let first = QueryObserver::new(platform.client(), key.clone());
    let second = QueryObserver::new(platform.client(), key.clone());
    assert_eq!(platform.client().consumer_count(&key), 2);

    drop(first);
    assert_eq!(platform.client().consumer_count(&key), 1);
    drop(second);
    assert_eq!(platform.client().consumer_count(&key), 0);
}

#[tokio::test]
async fn dropping_last_observer_tears_down_the_connection() {
    let store = Arc::new(MemoryStore::new());
    let platform = Platform::new(store.clone());

    store
        .set("users", "u1", fields(&[("displayName", json!("Ann"))]), false)
        .await
        .expect("seed");

    let watch = platform.watch_user("u1");
    let observer = watch.observe();
    watch.fetch().await.expect("fetch");
    assert_eq!(store.watcher_count(), 1);

    drop(observer);
    assert_eq!(store.watcher_count(), 0, "unmount released the connection");
}

#[tokio::test]
async fn on_change_receives_fresh_state() {
    let store = Arc::new(MemoryStore::new());
    let platform = Platform::new(store.clone());

    store
        .set("users", "u1", fields(&[("displayName", json!("Ann"))]), false)
        .await
        .expect("seed");

    let watch = platform.watch_user("u1");
    let observer = watch.observe();
    watch.fetch().await.expect("fetch");

    let states: Arc<Mutex<Vec<QueryState>>> = Arc::new(Mutex::new(Vec::new()));
    let states_clone = Arc::clone(&states);
    observer.on_change(move |state| {
        states_clone.lock().unwrap().push(state.clone());
    });

    store
        .set("users", "u1", fields(&[("displayName", json!("Annie"))]), false)
        .await
        .expect("update");

    let log = states.lock().unwrap();
    let last = log.last().expect("at least one notification");
    assert!(!last.is_loading);
    let record = last.data.as_ref().unwrap().record().unwrap();
    assert_eq!(record.get("displayName"), Some(&json!("Annie")));
}

#[tokio::test]
async fn listeners_are_removed_when_the_observer_drops() {
    let platform = Platform::new(Arc::new(MemoryStore::new()));
    let key = QueryKey::new("users").with("uid", "u1");

    let observer = QueryObserver::new(platform.client(), key.clone());
    observer.on_change(|_| {});
    observer.on_change(|_| {});
    assert_eq!(platform.client().listener_count(&key), 2);

    drop(observer);
    assert_eq!(platform.client().listener_count(&key), 0);
}

#[tokio::test]
async fn state_before_any_snapshot_is_loading() {
    let platform = Platform::new(Arc::new(MemoryStore::new()));
    let key = QueryKey::new("users").with("uid", "u1");
    let observer = QueryObserver::new(platform.client(), key);

    let state = observer.state();
    assert!(state.is_loading);
    assert!(state.data.is_none());
    assert!(state.error.is_none());
}
