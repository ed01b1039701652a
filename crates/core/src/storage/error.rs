//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// File part carried no content.
    #[error("file '{0}' is empty")]
    EmptyFile(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Could not obtain provider credentials.
    #[error("storage authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the file creation.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The file was created but could not be made publicly readable.
    #[error("granting public access to file {file_id} failed: {message}")]
    Permission {
        /// File that stays private.
        file_id: String,
        /// Provider message.
        message: String,
    },

    /// The provider rejected the deletion.
    #[error("deleting file {file_id} failed: {message}")]
    Delete {
        /// File that could not be deleted.
        file_id: String,
        /// Provider message.
        message: String,
    },

    /// Any other provider failure.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a file too large error.
    #[must_use]
    pub fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create an upload error.
    #[must_use]
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Create a permission error.
    #[must_use]
    pub fn permission(file_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Permission {
            file_id: file_id.into(),
            message: msg.into(),
        }
    }

    /// Create a delete error.
    #[must_use]
    pub fn delete(file_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Delete {
            file_id: file_id.into(),
            message: msg.into(),
        }
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether the error was caused by the uploaded payload itself.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::FileTooLarge { .. } | Self::EmptyFile(_))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Operation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_classification() {
        assert!(StorageError::file_too_large(10, 5).is_invalid_input());
        assert!(StorageError::EmptyFile("a.png".into()).is_invalid_input());
        assert!(!StorageError::upload("quota exceeded").is_invalid_input());
        assert!(!StorageError::delete("abc", "forbidden").is_invalid_input());
    }

    #[test]
    fn test_error_messages_carry_file_id() {
        let err = StorageError::permission("1AbC", "403 Forbidden");
        assert_eq!(
            err.to_string(),
            "granting public access to file 1AbC failed: 403 Forbidden"
        );
    }
}
