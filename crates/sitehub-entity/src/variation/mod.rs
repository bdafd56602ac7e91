//! Variation (change order) entities.

pub mod form;
pub mod model;
pub mod status;

pub use form::VariationForm;
pub use model::{CostLine, Variation};
pub use status::VariationStatus;
