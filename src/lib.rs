//! # SiteHub
//!
//! Optimistic mutation and audit reconciliation for construction project
//! records. This crate wires the workspace crates into one [`AppState`]:
//! the hosted backend client, the permission gate, the per-entity
//! workspaces, the audit outbox and its scheduled flush.

pub mod logging;
pub mod state;

pub use logging::init_logging;
pub use state::AppState;
