//! Variation (change order) service and workflow.

pub mod service;
pub mod workspace;

pub use service::{ReasonSuggestion, VariationService};
pub use workspace::VariationWorkspace;
