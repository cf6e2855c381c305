//! Tests for onboarding answer staging.

use std::sync::Arc;

use live_query::error::{LiveQueryError, StagingError};
use live_query::platform::{MemoryStaging, OnboardingDraft, Platform, StagingStore};
use live_query::store::MemoryStore;
use serde_json::{json, Map, Value};

fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

const ONBOARDING_FIELDS: &[&str] = &["school", "fnmi", "language", "interests"];

#[test]
fn staged_answers_round_trip() {
    let draft = OnboardingDraft::new(MemoryStaging::new());
    draft.stage("school", "Northside");
    assert_eq!(draft.answer("school").as_deref(), Some("Northside"));

    draft.clear("school");
    assert!(draft.answer("school").is_none());
}

#[test]
fn multi_value_answers_are_comma_joined_and_split() {
    let draft = OnboardingDraft::new(MemoryStaging::new());
    draft.stage_multi("interests", &["art", "music"]);
    assert_eq!(draft.answer("interests").as_deref(), Some("art,music"));

    let payload = draft.payload(&["interests"]);
    assert_eq!(payload.get("interests"), Some(&json!(["art", "music"])));
}

#[test]
fn payload_skips_unstaged_fields_and_keeps_single_values() {
    let draft = OnboardingDraft::new(MemoryStaging::new());
    draft.stage("school", "Northside");

    let payload = draft.payload(ONBOARDING_FIELDS);
    assert_eq!(payload.len(), 1);
    assert_eq!(payload.get("school"), Some(&json!("Northside")));
}

#[tokio::test]
async fn commit_bulk_writes_into_the_user_record() {
    let platform = Platform::new(Arc::new(MemoryStore::new()));
    platform
        .create_user("u1", fields(&[("email", json!("a@x.com"))]))
        .await
        .expect("create user");

    let draft = OnboardingDraft::new(MemoryStaging::new());
    draft.stage("school", "Northside");
    draft.stage_multi("language", &["en", "fr"]);

    draft
        .commit(&platform, "u1", ONBOARDING_FIELDS)
        .await
        .expect("commit");

    let user = platform.get_user("u1").await.expect("get").expect("present");
    assert_eq!(user.get("school"), Some(&json!("Northside")));
    assert_eq!(user.get("language"), Some(&json!(["en", "fr"])));
    assert_eq!(user.get("email"), Some(&json!("a@x.com")), "merge kept email");

    // Committed answers are cleared from the staging store.
    assert!(draft.answer("school").is_none());
    assert!(draft.answer("language").is_none());
}

#[tokio::test]
async fn commit_with_nothing_staged_errors() {
    let platform = Platform::new(Arc::new(MemoryStore::new()));
    platform
        .create_user("u1", fields(&[]))
        .await
        .expect("create user");

    let draft = OnboardingDraft::new(MemoryStaging::new());
    let err = draft
        .commit(&platform, "u1", ONBOARDING_FIELDS)
        .await
        .expect_err("empty commit");
    assert!(matches!(
        err,
        LiveQueryError::Staging(StagingError::NothingStaged)
    ));
}

#[test]
fn staging_store_contract_set_get_remove() {
    let staging = MemoryStaging::new();
    staging.set("email", "a@x.com");
    assert_eq!(staging.get("email").as_deref(), Some("a@x.com"));
    staging.set("email", "b@x.com");
    assert_eq!(staging.get("email").as_deref(), Some("b@x.com"));
    staging.remove("email");
    assert!(staging.get("email").is_none());
}
