//! End-to-end flows across the platform surface, the reactive layer, and
//! the in-memory store.

use std::sync::{Arc, Mutex};

use live_query::platform::{MemoryStaging, OnboardingDraft, Platform};
use live_query::store::{DocumentStore, MemoryStore};
use live_query::types::QueryState;
use serde_json::{json, Map, Value};

fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn setup() -> (Platform, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Platform::new(store.clone()), store)
}

// ============================================================================
// Sign-up → onboarding → dashboard
// ============================================================================

#[tokio::test]
async fn onboarding_flow_stages_then_bulk_writes_then_updates_watchers() {
    let (platform, _store) = setup();

    // Account exists after sign-up.
    platform
        .create_user("u1", fields(&[("email", json!("ann@x.com"))]))
        .await
        .expect("create user");

    // The dashboard is already watching the user record.
    let watch = platform.watch_user("u1");
    let observer = watch.observe();
    watch.fetch().await.expect("fetch");

    let states: Arc<Mutex<Vec<QueryState>>> = Arc::new(Mutex::new(Vec::new()));
    let states_clone = Arc::clone(&states);
    observer.on_change(move |state| {
        states_clone.lock().unwrap().push(state.clone());
    });

    // Onboarding stages answers step by step, then commits once.
    let draft = OnboardingDraft::new(MemoryStaging::new());
    draft.stage("school", "Northside");
    draft.stage_multi("interests", &["painting", "drums"]);
    draft
        .commit(&platform, "u1", &["school", "fnmi", "language", "interests"])
        .await
        .expect("commit");

    // The watcher saw the bulk write land.
    let log = states.lock().unwrap();
    let last = log.last().expect("notified");
    let record = last.data.as_ref().unwrap().record().unwrap();
    assert_eq!(record.get("school"), Some(&json!("Northside")));
    assert_eq!(record.get("interests"), Some(&json!(["painting", "drums"])));
    assert_eq!(record.get("email"), Some(&json!("ann@x.com")));
}

// ============================================================================
// Browse page: shared subscriptions across components
// ============================================================================

#[tokio::test]
async fn two_course_cards_share_one_live_connection() {
    let (platform, store) = setup();
    store
        .set(
            "Series",
            "s1",
            fields(&[("seriesName", json!("Acrylics")), ("uid", json!("c1"))]),
            false,
        )
        .await
        .expect("seed");

    // Two components, one logical query.
    let card_a = platform.watch_courses();
    let card_b = platform.watch_courses();
    let obs_a = card_a.observe();
    let obs_b = card_b.observe();

    let snap_a = card_a.fetch().await.expect("fetch a");
    let snap_b = card_b.fetch().await.expect("fetch b");
    assert_eq!(snap_a, snap_b);
    assert_eq!(store.watcher_count(), 1, "deduplicated to one connection");

    // First unmount keeps the connection; the last one releases it.
    drop(obs_a);
    assert_eq!(store.watcher_count(), 1);
    drop(obs_b);
    assert_eq!(store.watcher_count(), 0);
}

#[tokio::test]
async fn remount_after_teardown_reuses_cache_then_refreshes() {
    let (platform, store) = setup();
    store
        .set(
            "Series",
            "s1",
            fields(&[("seriesName", json!("Acrylics")), ("uid", json!("c1"))]),
            false,
        )
        .await
        .expect("seed");

    let watch = platform.watch_courses();
    {
        let _observer = watch.observe();
        watch.fetch().await.expect("fetch");
    }
    // All consumers gone: the connection is closed but the snapshot stays.
    assert_eq!(store.watcher_count(), 0);
    let state = watch.state();
    assert!(state.data.is_some(), "stale data available on remount");

    // A remount subscribes afresh.
    let _observer = watch.observe();
    let snapshot = watch.fetch().await.expect("re-fetch");
    assert_eq!(snapshot.records().unwrap().len(), 1);
    assert_eq!(store.watcher_count(), 1);
}

// ============================================================================
// Course page: progress tracking across videos
// ============================================================================

#[tokio::test]
async fn progress_written_on_one_page_updates_another() {
    let (platform, store) = setup();
    for video in ["v1", "v2"] {
        store
            .set("Videos", video, fields(&[("homeSeries", json!("c1"))]), false)
            .await
            .expect("seed video");
    }

    // The course page watches the owner's progress for its videos.
    let course_page = platform.watch_progress_by_course("u1", &["v1", "v2"]);
    let _observer = course_page.observe();
    let initial = course_page.fetch().await.expect("fetch");
    assert_eq!(initial.records().unwrap().len(), 0);

    // The player records progress.
    platform
        .create_video_progress(fields(&[
            ("owner", json!("u1")),
            ("videoId", json!("v1")),
            ("progress", json!(0.5)),
        ]))
        .await
        .expect("record progress");

    let records = course_page.state().data.unwrap().records().unwrap().len();
    assert_eq!(records, 1, "course page saw the player's write");
}

// ============================================================================
// Settings: watchlist round trip with per-key isolation
// ============================================================================

#[tokio::test]
async fn one_keys_failure_leaves_other_keys_untouched() {
    let (platform, store) = setup();

    // A healthy subscription...
    store
        .set(
            "Artists",
            "a1",
            fields(&[("name", json!("Riley")), ("uid", json!("artist-1"))]),
            false,
        )
        .await
        .expect("seed");
    let creators = platform.watch_creators();
    creators.fetch().await.expect("fetch creators");

    // ...and a corrupt document behind a different key.
    store
        .set("Schools", "bad", fields(&[("school", json!(3))]), false)
        .await
        .expect("seed corrupt");
    let schools = platform.watch_schools();
    assert!(schools.fetch().await.is_err(), "corrupt key fails");

    let creators_state = creators.state();
    assert!(creators_state.error.is_none(), "other keys unaffected");
    assert_eq!(
        creators_state.data.unwrap().records().unwrap().len(),
        1,
        "healthy key still serves its snapshot"
    );
}
