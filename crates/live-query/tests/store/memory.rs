//! Integration tests for `MemoryStore`.

use std::sync::{Arc, Mutex};

use live_query::error::StoreError;
use live_query::query::{SortDirection, StoreQuery};
use live_query::store::{
    server_timestamp, DocumentStore, MemoryStore, WatchObserver, WatchTarget,
};
use live_query::types::StoreResponse;
use serde_json::{json, Map, Value};

// ============================================================================
// Helpers
// ============================================================================

fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Collect every delivery into a shared call-log.
fn collecting_observer() -> (WatchObserver, Arc<Mutex<Vec<StoreResponse>>>) {
    let log: Arc<Mutex<Vec<StoreResponse>>> = Arc::new(Mutex::new(Vec::new()));
    let log_clone = Arc::clone(&log);
    let observer: WatchObserver = Arc::new(move |event| {
        log_clone
            .lock()
            .unwrap()
            .push(event.expect("memory store delivers Ok"));
    });
    (observer, log)
}

// ============================================================================
// One-shot operations
// ============================================================================

#[tokio::test]
async fn get_reports_existence_and_absence() {
    let store = MemoryStore::new();
    store
        .set("users", "u1", fields(&[("email", json!("a@x.com"))]), false)
        .await
        .expect("set");

    let present = store.get("users", "u1").await.expect("get");
    assert!(present.exists());

    let absent = store.get("users", "ghost").await.expect("get");
    assert!(!absent.exists());
}

#[tokio::test]
async fn create_generates_distinct_ids() {
    let store = MemoryStore::new();
    let a = store.create("items", fields(&[])).await.expect("create");
    let b = store.create("items", fields(&[])).await.expect("create");
    assert_ne!(a, b);
    assert!(store.get("items", &a).await.expect("get").exists());
}

#[tokio::test]
async fn set_merge_keeps_unmentioned_fields() {
    let store = MemoryStore::new();
    store
        .set(
            "users",
            "u1",
            fields(&[("email", json!("a@x.com")), ("school", json!("Northside"))]),
            false,
        )
        .await
        .expect("set");
    store
        .set("users", "u1", fields(&[("school", json!("Eastside"))]), true)
        .await
        .expect("merge");

    let response = store.get("users", "u1").await.expect("get");
    let StoreResponse::Document { fields: Some(doc), .. } = response else {
        panic!("document expected");
    };
    assert_eq!(doc.get("email"), Some(&json!("a@x.com")));
    assert_eq!(doc.get("school"), Some(&json!("Eastside")));
}

#[tokio::test]
async fn set_without_merge_replaces_the_document() {
    let store = MemoryStore::new();
    store
        .set("users", "u1", fields(&[("email", json!("a@x.com"))]), false)
        .await
        .expect("set");
    store
        .set("users", "u1", fields(&[("school", json!("Eastside"))]), false)
        .await
        .expect("replace");

    let response = store.get("users", "u1").await.expect("get");
    let StoreResponse::Document { fields: Some(doc), .. } = response else {
        panic!("document expected");
    };
    assert!(doc.get("email").is_none(), "replaced document lost old fields");
}

#[tokio::test]
async fn update_missing_document_fails() {
    let store = MemoryStore::new();
    let err = store
        .update("users", "ghost", fields(&[("email", json!("x"))]))
        .await
        .expect_err("update of missing document");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn delete_is_a_no_op_for_absent_documents() {
    let store = MemoryStore::new();
    store.delete("users", "ghost").await.expect("delete absent");
}

#[tokio::test]
async fn create_resolves_server_timestamps() {
    let store = MemoryStore::new();
    let id = store
        .create("user-progress", fields(&[("createdAt", server_timestamp())]))
        .await
        .expect("create");

    let response = store.get("user-progress", &id).await.expect("get");
    let StoreResponse::Document { fields: Some(doc), .. } = response else {
        panic!("document expected");
    };
    let stamped = doc.get("createdAt").and_then(|v| v.as_str()).expect("stamped");
    assert!(stamped.contains('T'), "ISO timestamp expected, got {stamped}");
    assert_ne!(stamped, "$serverTimestamp");
}

// ============================================================================
// Live connections
// ============================================================================

#[tokio::test]
async fn watch_doc_delivers_initial_snapshot_then_pushes() {
    let store = MemoryStore::new();
    store
        .set("users", "u1", fields(&[("displayName", json!("Ann"))]), false)
        .await
        .expect("seed");

    let (observer, log) = collecting_observer();
    let handle = store
        .watch(&WatchTarget::doc("users", "u1"), observer)
        .expect("watch");

    // Initial delivery happened during registration.
    assert_eq!(log.lock().unwrap().len(), 1);

    store
        .set("users", "u1", fields(&[("displayName", json!("Annie"))]), false)
        .await
        .expect("update");

    {
        let entries = log.lock().unwrap();
        assert_eq!(entries.len(), 2);
        let StoreResponse::Document { fields: Some(doc), .. } = &entries[1] else {
            panic!("document expected");
        };
        assert_eq!(doc.get("displayName"), Some(&json!("Annie")));
    }
    handle.close();
}

#[tokio::test]
async fn watch_doc_sees_deletion_as_absence() {
    let store = MemoryStore::new();
    store
        .set("users", "u1", fields(&[]), false)
        .await
        .expect("seed");

    let (observer, log) = collecting_observer();
    let _handle = store
        .watch(&WatchTarget::doc("users", "u1"), observer)
        .expect("watch");

    store.delete("users", "u1").await.expect("delete");

    let entries = log.lock().unwrap();
    assert!(!entries.last().unwrap().exists(), "deletion pushes absence");
}

#[tokio::test]
async fn watch_query_applies_filter_order_and_limit() {
    let store = MemoryStore::new();
    for (id, owner, created) in [
        ("p1", "u1", "2024-01-01T00:00:00Z"),
        ("p2", "u2", "2024-01-02T00:00:00Z"),
        ("p3", "u1", "2024-01-03T00:00:00Z"),
        ("p4", "u1", "2024-01-04T00:00:00Z"),
    ] {
        store
            .set(
                "user-progress",
                id,
                fields(&[("owner", json!(owner)), ("createdAt", json!(created))]),
                false,
            )
            .await
            .expect("seed");
    }

    let (observer, log) = collecting_observer();
    let query = StoreQuery::new()
        .where_eq("owner", "u1")
        .order_by("createdAt", SortDirection::Desc)
        .limit(2);
    let _handle = store
        .watch(&WatchTarget::query("user-progress", query), observer)
        .expect("watch");

    let entries = log.lock().unwrap();
    let StoreResponse::Documents(docs) = &entries[0] else {
        panic!("documents expected");
    };
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["p4", "p3"], "newest two of u1's records");
}

#[tokio::test]
async fn watch_query_pushes_on_matching_writes() {
    let store = MemoryStore::new();
    let (observer, log) = collecting_observer();
    let query = StoreQuery::new().where_eq("owner", "u1");
    let _handle = store
        .watch(&WatchTarget::query("user-watchlist", query), observer)
        .expect("watch");

    assert_eq!(log.lock().unwrap().len(), 1, "initial (empty) delivery");

    store
        .set(
            "user-watchlist",
            "w1",
            fields(&[("owner", json!("u1")), ("courseId", json!("c1"))]),
            false,
        )
        .await
        .expect("write");

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 2);
    let StoreResponse::Documents(docs) = &entries[1] else {
        panic!("documents expected");
    };
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "w1");
}

#[tokio::test]
async fn closed_watchers_receive_nothing_further() {
    let store = MemoryStore::new();
    let (observer, log) = collecting_observer();
    let handle = store
        .watch(&WatchTarget::doc("users", "u1"), observer)
        .expect("watch");
    assert_eq!(store.watcher_count(), 1);

    handle.close();
    assert_eq!(store.watcher_count(), 0);

    store
        .set("users", "u1", fields(&[]), false)
        .await
        .expect("write");
    assert_eq!(log.lock().unwrap().len(), 1, "only the initial delivery");
}

#[tokio::test]
async fn close_is_idempotent() {
    let store = MemoryStore::new();
    let (observer, _log) = collecting_observer();
    let handle = store
        .watch(&WatchTarget::doc("users", "u1"), observer)
        .expect("watch");

    handle.close();
    handle.close();
    assert_eq!(store.watcher_count(), 0);
}

#[tokio::test]
async fn watchers_are_scoped_to_their_resource() {
    let store = MemoryStore::new();
    let (observer, log) = collecting_observer();
    let _handle = store
        .watch(&WatchTarget::query("Series", StoreQuery::new()), observer)
        .expect("watch");

    store
        .set("Artists", "a1", fields(&[("name", json!("X"))]), false)
        .await
        .expect("write elsewhere");

    assert_eq!(
        log.lock().unwrap().len(),
        1,
        "writes to other resources do not push"
    );
}
