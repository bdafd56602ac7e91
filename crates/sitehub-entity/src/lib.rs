//! # sitehub-entity
//!
//! Domain entity models for SiteHub. Every record type here mirrors a row
//! of a hosted table and implements [`Entity`] so the optimistic engine,
//! the diff logger and the entity services can work on it generically.

pub mod access;
pub mod audit;
pub mod entity;
pub mod inspection;
pub mod pending;
pub mod task;
pub mod variation;

pub use access::{Action, Module, Role};
pub use audit::AuditEntry;
pub use entity::Entity;
pub use inspection::{InspectionStatus, QaInspection};
pub use pending::{ActionStatus, ActionType, PendingAction};
pub use task::{Task, TaskStatus};
pub use variation::{CostLine, Variation, VariationForm, VariationStatus};
