//! Role × module × action permission gate.

pub mod context;
pub mod enforcer;
pub mod policies;

pub use context::AccessContext;
pub use enforcer::PermissionGate;
pub use policies::{Decision, GatePolicies};
