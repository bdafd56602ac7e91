//! Convenience result type alias for SiteHub.

use crate::error::AppError;

/// A specialized `Result` type for SiteHub operations.
pub type AppResult<T> = Result<T, AppError>;
