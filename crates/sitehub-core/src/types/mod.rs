//! Core type definitions used across the SiteHub workspace.

pub mod id;
pub mod query;

pub use id::*;
pub use query::{Filter, FilterOp, Query, SortDirection, SortField};
