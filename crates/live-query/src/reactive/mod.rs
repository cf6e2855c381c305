//! Reactive query layer — live store subscriptions behind a pull-based
//! cache.
//!
//! # Overview
//!
//! [`QueryClient`] deduplicates live connections per canonical query key,
//! resolves the first observed snapshot as a deferred result, and pushes
//! every later snapshot into a shared cache visible to all current and
//! future consumers of the key. Connections are refcounted by consumer
//! registrations and torn down exactly once when the count reaches zero.
//!
//! # Modules
//!
//! - [`client`] — [`QueryClient`]: registry, cache, subscribe/fetch,
//!   consumer lifecycle.
//! - [`normalize`] — raw store responses → [`Snapshot`](crate::types::Snapshot).
//! - [`emitter`] — [`KeyedEmitter<T>`]: per-key synchronous listeners.
//! - [`observer`] — [`QueryObserver`]: the hook-like consumer contract.

pub mod client;
pub mod emitter;
pub mod normalize;
pub mod observer;

pub use client::QueryClient;
pub use emitter::{KeyedEmitter, ListenerId};
pub use normalize::{normalize, normalize_checked};
pub use observer::QueryObserver;
