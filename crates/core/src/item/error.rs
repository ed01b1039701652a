//! Item error types.

use lectern_shared::AppError;
use thiserror::Error;

use crate::storage::StorageError;

/// Item operation errors.
#[derive(Debug, Error)]
pub enum ItemError {
    /// No record matches the requested identifier.
    #[error("item not found: {0}")]
    NotFound(String),

    /// Request input could not be accepted.
    #[error("{0}")]
    Validation(String),

    /// Remote file store operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ItemError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(_) => AppError::NotFound("Item not found".to_string()),
            ItemError::Validation(msg) => AppError::Validation(msg),
            ItemError::Storage(e) if e.is_invalid_input() => AppError::Validation(e.to_string()),
            ItemError::Storage(e) => AppError::ExternalService(e.to_string()),
            ItemError::Repository(msg) => AppError::Database(msg),
        }
    }
}
