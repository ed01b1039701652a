//! Storage configuration types.

pub use lectern_shared::StorageSettings as StorageProvider;

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl StorageConfig {
    /// Default max file size: 100MB. Sermon recordings are large.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Get the provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match &self.provider {
            StorageProvider::GoogleDrive { .. } => "google_drive",
            StorageProvider::S3 { .. } => "s3",
            StorageProvider::AzureBlob { .. } => "azure_blob",
            StorageProvider::LocalFs { .. } => "local",
        }
    }
}
