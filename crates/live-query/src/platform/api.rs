//! Platform — the typed data-access surface the UI consumes.
//!
//! Watch-functions build the query key and watch target for one logical
//! request; one-shot functions go straight to the store. Creates stamp
//! `createdAt` with the server-timestamp sentinel.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::{LiveQueryError, StoreError};
use crate::key::QueryKey;
use crate::query::{SortDirection, StoreQuery};
use crate::reactive::{normalize, QueryClient, QueryObserver};
use crate::store::{server_timestamp, DocumentStore, WatchTarget};
use crate::types::{DocRecord, QueryState, Snapshot};

use super::resources::{
    self, ARTISTS, LEARNING_PATHS, SCHOOLS, SERIES, USERS, USER_DOWNLOADS, USER_PROGRESS,
    USER_WATCHLIST, VIDEOS,
};

// ============================================================================
// WatchQuery
// ============================================================================

/// One logical live request: a query key bound to the watch target that
/// opens its connection. Cheap to construct; nothing happens until
/// `fetch` or `observe`.
pub struct WatchQuery {
    key: QueryKey,
    target: WatchTarget,
    client: Arc<QueryClient>,
    store: Arc<dyn DocumentStore>,
}

impl WatchQuery {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Resolve the current snapshot: cached if fresh, shared with an
    /// in-flight first snapshot if one is pending, otherwise by opening
    /// the live connection.
    pub async fn fetch(&self) -> Result<Snapshot, LiveQueryError> {
        let store = Arc::clone(&self.store);
        let target = self.target.clone();
        self.client
            .fetch(&self.key, move |observer| store.watch(&target, observer))
            .await
    }

    /// Force a fresh connection for the key, replacing any existing one.
    pub async fn resubscribe(&self) -> Result<Snapshot, LiveQueryError> {
        let store = Arc::clone(&self.store);
        let target = self.target.clone();
        self.client
            .subscribe(&self.key, move |observer| store.watch(&target, observer))
            .await
    }

    /// Register as a consumer of this key. Dropping the returned observer
    /// releases the registration (and the connection, when last).
    pub fn observe(&self) -> QueryObserver {
        QueryObserver::new(&self.client, self.key.clone())
    }

    /// The consumer-facing `{ is_loading, data, error }` state.
    pub fn state(&self) -> QueryState {
        self.client.state(&self.key)
    }
}

// ============================================================================
// Platform
// ============================================================================

/// The platform data layer: one query client over one document store.
pub struct Platform {
    client: Arc<QueryClient>,
    store: Arc<dyn DocumentStore>,
}

impl Platform {
    /// Build the platform over a store, with the standard resource
    /// catalog driving normalization-time validation.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            client: Arc::new(QueryClient::new(resources::catalog())),
            store,
        }
    }

    pub fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn watch(&self, key: QueryKey, target: WatchTarget) -> WatchQuery {
        WatchQuery {
            key,
            target,
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
        }
    }

    /// One-shot single-document read, normalized.
    async fn get_one(&self, resource: &str, id: &str) -> Result<Option<DocRecord>, LiveQueryError> {
        let response = self.store.get(resource, id).await?;
        match normalize(response) {
            Snapshot::One(record) => Ok(record),
            Snapshot::Many(_) => Err(LiveQueryError::Internal(format!(
                "single-document read of {resource}/{id} returned a document set"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Subscribe to one user's record.
    pub fn watch_user(&self, uid: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USERS).with("uid", uid),
            WatchTarget::doc(USERS, uid),
        )
    }

    /// Fetch user data once (non-subscribing).
    pub async fn get_user(&self, uid: &str) -> Result<Option<DocRecord>, LiveQueryError> {
        self.get_one(USERS, uid).await
    }

    /// Create (or merge into) a user record at a known id.
    pub async fn create_user(
        &self,
        uid: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.store.set(USERS, uid, fields, true).await
    }

    /// Update an existing user record.
    pub async fn update_user(
        &self,
        uid: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.store.update(USERS, uid, fields).await
    }

    pub async fn delete_user(&self, uid: &str) -> Result<(), StoreError> {
        self.store.delete(USERS, uid).await
    }

    // -----------------------------------------------------------------------
    // Catalog collections
    // -----------------------------------------------------------------------

    pub fn watch_schools(&self) -> WatchQuery {
        self.watch(
            QueryKey::new(SCHOOLS),
            WatchTarget::query(
                SCHOOLS,
                StoreQuery::new().order_by("school", SortDirection::Asc),
            ),
        )
    }

    pub fn watch_courses(&self) -> WatchQuery {
        self.watch(
            QueryKey::new(SERIES),
            WatchTarget::query(
                SERIES,
                StoreQuery::new().order_by("seriesName", SortDirection::Asc),
            ),
        )
    }

    pub fn watch_creators(&self) -> WatchQuery {
        self.watch(
            QueryKey::new(ARTISTS),
            WatchTarget::query(
                ARTISTS,
                StoreQuery::new().order_by("name", SortDirection::Asc),
            ),
        )
    }

    pub fn watch_learning_paths(&self) -> WatchQuery {
        self.watch(
            QueryKey::new(LEARNING_PATHS),
            WatchTarget::query(LEARNING_PATHS, StoreQuery::new()),
        )
    }

    /// Subscribe to the course whose `uid` field matches.
    pub fn watch_course_by_uid(&self, uid: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(SERIES).with("uid", uid),
            WatchTarget::query(SERIES, StoreQuery::new().where_eq("uid", uid).limit(1)),
        )
    }

    /// Subscribe to the creator whose `uid` field matches.
    pub fn watch_creator_by_uid(&self, uid: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(ARTISTS).with("uid", uid),
            WatchTarget::query(ARTISTS, StoreQuery::new().where_eq("uid", uid).limit(1)),
        )
    }

    /// Subscribe to a course's videos.
    pub fn watch_videos_by_course(&self, course_id: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(VIDEOS).with("homeSeries", course_id),
            WatchTarget::query(
                VIDEOS,
                StoreQuery::new().where_eq("homeSeries", course_id),
            ),
        )
    }

    // -----------------------------------------------------------------------
    // Video progress
    // -----------------------------------------------------------------------

    /// Subscribe to one progress record by id.
    pub fn watch_video_progress(&self, id: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_PROGRESS).with("id", id),
            WatchTarget::doc(USER_PROGRESS, id),
        )
    }

    /// Fetch one progress record once (non-subscribing).
    pub async fn get_video_progress(
        &self,
        id: &str,
    ) -> Result<Option<DocRecord>, LiveQueryError> {
        self.get_one(USER_PROGRESS, id).await
    }

    /// Fetch the progress record stored under a user's id.
    pub async fn get_user_progress(
        &self,
        uid: &str,
    ) -> Result<Option<DocRecord>, LiveQueryError> {
        self.get_one(USER_PROGRESS, uid).await
    }

    /// Subscribe to all progress records owned by `owner`, newest first.
    pub fn watch_progress_by_owner(&self, owner: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_PROGRESS).with("owner", owner),
            WatchTarget::query(
                USER_PROGRESS,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .order_by("createdAt", SortDirection::Desc),
            ),
        )
    }

    /// Subscribe to an owner's progress across a course's videos.
    pub fn watch_progress_by_course(&self, owner: &str, video_ids: &[&str]) -> WatchQuery {
        let ids: Vec<Value> = video_ids.iter().map(|id| json!(id)).collect();
        self.watch(
            QueryKey::new(USER_PROGRESS)
                .with("owner", owner)
                .with("videoIds", Value::Array(ids.clone())),
            WatchTarget::query(
                USER_PROGRESS,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .where_in("videoId", ids)
                    .order_by("createdAt", SortDirection::Desc),
            ),
        )
    }

    /// Subscribe to an owner's progress for one video.
    pub fn watch_progress_by_video(&self, owner: &str, video_id: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_PROGRESS)
                .with("owner", owner)
                .with("videoId", video_id),
            WatchTarget::query(
                USER_PROGRESS,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .where_eq("videoId", video_id)
                    .limit(1),
            ),
        )
    }

    /// Create a progress record; `createdAt` is stamped by the store.
    pub async fn create_video_progress(
        &self,
        mut fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        fields.insert("createdAt".to_string(), server_timestamp());
        self.store.create(USER_PROGRESS, fields).await
    }

    pub async fn update_video_progress(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.store.update(USER_PROGRESS, id, fields).await
    }

    pub async fn delete_video_progress(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(USER_PROGRESS, id).await
    }

    // -----------------------------------------------------------------------
    // Watchlist
    // -----------------------------------------------------------------------

    pub fn watch_watchlist_by_owner(&self, owner: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_WATCHLIST).with("owner", owner),
            WatchTarget::query(
                USER_WATCHLIST,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .order_by("createdAt", SortDirection::Desc),
            ),
        )
    }

    /// Subscribe to one owner's watchlist entry for one course.
    pub fn watch_watchlist_by_id(&self, owner: &str, course_id: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_WATCHLIST)
                .with("owner", owner)
                .with("courseId", course_id),
            WatchTarget::query(
                USER_WATCHLIST,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .where_eq("courseId", course_id)
                    .limit(1),
            ),
        )
    }

    pub async fn create_watchlist_course(
        &self,
        mut fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        fields.insert("createdAt".to_string(), server_timestamp());
        self.store.create(USER_WATCHLIST, fields).await
    }

    pub async fn delete_watchlist_course(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(USER_WATCHLIST, id).await
    }

    // -----------------------------------------------------------------------
    // Downloads
    // -----------------------------------------------------------------------

    pub fn watch_downloads_by_owner(&self, owner: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_DOWNLOADS).with("owner", owner),
            WatchTarget::query(
                USER_DOWNLOADS,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .order_by("createdAt", SortDirection::Desc),
            ),
        )
    }

    /// Subscribe to one owner's download entry for one course.
    pub fn watch_downloads_by_id(&self, owner: &str, course_id: &str) -> WatchQuery {
        self.watch(
            QueryKey::new(USER_DOWNLOADS)
                .with("owner", owner)
                .with("courseId", course_id),
            WatchTarget::query(
                USER_DOWNLOADS,
                StoreQuery::new()
                    .where_eq("owner", owner)
                    .where_eq("courseId", course_id)
                    .limit(1),
            ),
        )
    }

    pub async fn create_download_course(
        &self,
        mut fields: Map<String, Value>,
    ) -> Result<String, StoreError> {
        fields.insert("createdAt".to_string(), server_timestamp());
        self.store.create(USER_DOWNLOADS, fields).await
    }

    pub async fn update_downloads(
        &self,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.store.update(USER_DOWNLOADS, id, fields).await
    }

    pub async fn delete_download_course(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(USER_DOWNLOADS, id).await
    }
}
