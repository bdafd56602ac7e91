//! # sitehub-core
//!
//! Core crate for SiteHub. Contains the traits that reach the hosted
//! backend (tables, RPC functions, storage buckets, email), configuration
//! schemas, typed identifiers, domain events, the shared timer registry,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other SiteHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod timer;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorCode, ErrorKind};
pub use result::AppResult;
