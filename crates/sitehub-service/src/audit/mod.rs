//! Audit reconciliation: field diffs, the write outbox and the trail cache.

pub mod diff;
pub mod outbox;
pub mod trail;

pub use diff::FieldDiffLogger;
pub use outbox::{AuditOutbox, FlushReport};
pub use trail::AuditTrailCache;
