//! Query model for the store boundary: filter / order / limit parameters
//! and their in-process evaluation.

pub mod execute;
pub mod types;

pub use execute::{compare_values, matches_filters, run_query};
pub use types::{Filter, FilterOp, OrderBy, SortDirection, StoreQuery};
