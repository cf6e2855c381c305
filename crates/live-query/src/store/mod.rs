//! Backing store boundary and the in-process implementation.
//!
//! - [`traits`] — [`DocumentStore`], [`WatchHandle`], [`WatchTarget`],
//!   the server-timestamp sentinel.
//! - [`memory`] — [`MemoryStore`], an in-memory store with synchronous
//!   push delivery.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{
    server_timestamp, DocumentStore, WatchHandle, WatchObserver, WatchTarget, SERVER_TIMESTAMP,
};
