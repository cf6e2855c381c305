//! The learning platform's data surface over the reactive query layer.
//!
//! - [`resources`] — resource definitions and the standard catalog.
//! - [`api`] — [`Platform`] and [`WatchQuery`]: the functions UI code
//!   calls.
//! - [`staging`] — onboarding answer staging and the final bulk write.

pub mod api;
pub mod resources;
pub mod staging;

pub use api::{Platform, WatchQuery};
pub use staging::{MemoryStaging, OnboardingDraft, StagingStore, MULTI_VALUE_FIELDS};
