//! Optimistic pending action records.

pub mod model;

pub use model::{ActionStatus, ActionType, PendingAction};
