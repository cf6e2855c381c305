//! The learning platform's resource catalog.
//!
//! Resource names match the backing store's collection names. Schemas
//! require only the fields queries and ordering depend on; everything
//! else is optional so documents written by older clients still pass the
//! normalization boundary.

use crate::resource::{resource, ResourceCatalog, ResourceDef};
use crate::schema::t;

pub const USERS: &str = "users";
pub const SCHOOLS: &str = "Schools";
pub const SERIES: &str = "Series";
pub const ARTISTS: &str = "Artists";
pub const LEARNING_PATHS: &str = "LearningPaths";
pub const VIDEOS: &str = "Videos";
pub const USER_PROGRESS: &str = "user-progress";
pub const USER_WATCHLIST: &str = "user-watchlist";
pub const USER_DOWNLOADS: &str = "user-downloads";

pub fn users_def() -> ResourceDef {
    resource(USERS)
        .field("displayName", t::optional(t::string()))
        .field("email", t::optional(t::string()))
        .field("school", t::optional(t::string()))
        .field("fnmi", t::optional(t::array(t::string())))
        .field("language", t::optional(t::array(t::string())))
        .field("interests", t::optional(t::array(t::string())))
        .build()
}

pub fn schools_def() -> ResourceDef {
    resource(SCHOOLS).field("school", t::string()).build()
}

pub fn series_def() -> ResourceDef {
    resource(SERIES)
        .field("seriesName", t::string())
        .field("uid", t::string())
        .field("artist", t::optional(t::string()))
        .field("category", t::optional(t::string()))
        .field("description", t::optional(t::string()))
        .field("thumbnail", t::optional(t::string()))
        .build()
}

pub fn artists_def() -> ResourceDef {
    resource(ARTISTS)
        .field("name", t::string())
        .field("uid", t::string())
        .field("bio", t::optional(t::string()))
        .field("photo", t::optional(t::string()))
        .build()
}

pub fn learning_paths_def() -> ResourceDef {
    resource(LEARNING_PATHS)
        .field("name", t::string())
        .field("seriesIds", t::optional(t::array(t::string())))
        .build()
}

pub fn videos_def() -> ResourceDef {
    resource(VIDEOS)
        .field("homeSeries", t::string())
        .field("title", t::optional(t::string()))
        .field("videoUrl", t::optional(t::string()))
        .field("duration", t::optional(t::number()))
        .field("order", t::optional(t::number()))
        .build()
}

pub fn user_progress_def() -> ResourceDef {
    resource(USER_PROGRESS)
        .field("owner", t::string())
        .field("videoId", t::optional(t::string()))
        .field("progress", t::optional(t::number()))
        .field("completed", t::optional(t::boolean()))
        .field("createdAt", t::optional(t::date()))
        .build()
}

pub fn user_watchlist_def() -> ResourceDef {
    resource(USER_WATCHLIST)
        .field("owner", t::string())
        .field("courseId", t::string())
        .field("createdAt", t::optional(t::date()))
        .build()
}

pub fn user_downloads_def() -> ResourceDef {
    resource(USER_DOWNLOADS)
        .field("owner", t::string())
        .field("courseId", t::string())
        .field("createdAt", t::optional(t::date()))
        .build()
}

/// The full catalog, assembled once at process start.
pub fn catalog() -> ResourceCatalog {
    ResourceCatalog::new()
        .register(users_def())
        .register(schools_def())
        .register(series_def())
        .register(artists_def())
        .register(learning_paths_def())
        .register(videos_def())
        .register(user_progress_def())
        .register(user_watchlist_def())
        .register(user_downloads_def())
}
