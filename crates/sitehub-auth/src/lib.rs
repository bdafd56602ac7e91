//! # sitehub-auth
//!
//! Authorization for SiteHub mutations.
//!
//! - `gate`: the permission gate, an immutable role × module × action
//!   policy table and the enforcer consulted before any mutation.

pub mod gate;

pub use gate::{AccessContext, Decision, GatePolicies, PermissionGate};
