//! live-query — a reactive query layer bridging a live, push-based
//! document store to a pull-based cache.
//!
//! One [`QueryClient`](reactive::QueryClient) per process deduplicates
//! live connections per canonical [`QueryKey`](key::QueryKey), resolves
//! the first observed snapshot as a deferred result, pushes later
//! snapshots into a shared cache, and tears connections down when the
//! last consumer of a key goes away. The [`platform`] module is the
//! typed domain surface built on top of it.

pub mod error;
pub mod key;
pub mod platform;
pub mod query;
pub mod reactive;
pub mod resource;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{LiveQueryError, Result};
pub use key::QueryKey;
pub use reactive::{QueryClient, QueryObserver};
pub use types::{DocRecord, QueryState, QueryUpdate, Snapshot};
