//! Convenience result type alias for Weiser.

use crate::error::AppError;

/// A specialized `Result` type for Weiser operations.
pub type AppResult<T> = Result<T, AppError>;
