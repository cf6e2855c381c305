//! Onboarding answer staging.
//!
//! Sign-up flows collect answers step by step into a persisted key/value
//! string store and write them to the user record in one final bulk
//! update. Multi-value answers are stored comma-joined and split back
//! into arrays at commit time. The staging store itself is out-of-band
//! state, not part of the reactive layer.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use crate::error::{LiveQueryError, StagingError};

use super::api::Platform;

// ============================================================================
// StagingStore
// ============================================================================

/// A persisted key/value string store (browser-local storage shaped).
pub trait StagingStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory staging store.
#[derive(Default)]
pub struct MemoryStaging {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StagingStore for MemoryStaging {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

// ============================================================================
// OnboardingDraft
// ============================================================================

/// Answer fields that hold multiple selections, stored comma-joined.
pub const MULTI_VALUE_FIELDS: &[&str] = &["fnmi", "language", "interests"];

/// A user's in-progress onboarding answers over a staging store.
pub struct OnboardingDraft<S: StagingStore> {
    staging: S,
}

impl<S: StagingStore> OnboardingDraft<S> {
    pub fn new(staging: S) -> Self {
        Self { staging }
    }

    /// Stage a single-valued answer.
    pub fn stage(&self, field: &str, value: &str) {
        self.staging.set(field, value);
    }

    /// Stage a multi-valued answer (comma-joined, as the sign-up views
    /// store their checkbox selections).
    pub fn stage_multi(&self, field: &str, values: &[&str]) {
        self.staging.set(field, &values.join(","));
    }

    /// Read back a staged answer.
    pub fn answer(&self, field: &str) -> Option<String> {
        self.staging.get(field)
    }

    /// Discard a staged answer.
    pub fn clear(&self, field: &str) {
        self.staging.remove(field);
    }

    /// Assemble the staged answers for `fields` into an update payload.
    /// Fields never staged are skipped; multi-value fields are split into
    /// string arrays.
    pub fn payload(&self, fields: &[&str]) -> Map<String, Value> {
        let mut data = Map::new();
        for &field in fields {
            let Some(raw) = self.staging.get(field) else {
                continue;
            };
            let value = if MULTI_VALUE_FIELDS.contains(&field) {
                json!(raw.split(',').collect::<Vec<_>>())
            } else {
                json!(raw)
            };
            data.insert(field.to_string(), value);
        }
        data
    }

    /// Bulk-write the staged answers into the user's record and clear
    /// the staged entries. Errors with [`StagingError::NothingStaged`]
    /// when no listed field has a staged value.
    pub async fn commit(
        &self,
        platform: &Platform,
        uid: &str,
        fields: &[&str],
    ) -> Result<(), LiveQueryError> {
        let data = self.payload(fields);
        if data.is_empty() {
            return Err(StagingError::NothingStaged.into());
        }
        platform.update_user(uid, data).await?;
        for &field in fields {
            self.staging.remove(field);
        }
        Ok(())
    }
}
