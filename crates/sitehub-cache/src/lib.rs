//! # sitehub-cache
//!
//! Cache provider implementation for SiteHub's scope-keyed read caches,
//! backed by [moka](https://crates.io/crates/moka) with per-entry TTLs.

pub mod keys;
pub mod memory;
pub mod provider;

pub use provider::CacheManager;
