//! Storage service implementation.

use std::future::Future;

use bytes::Bytes;
use opendal::{Operator, services};
use tracing::{debug, info};
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::drive::{DriveClient, ServiceAccountKey};
use super::error::StorageError;
use super::reference::parse_file_reference;

/// Opaque identifier issued by the remote store for an uploaded file.
pub type FileId = String;

/// A file received from a client, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original filename.
    pub file_name: String,
    /// Content type (MIME type).
    pub content_type: String,
    /// File content.
    pub content: Bytes,
}

impl UploadFile {
    /// Create a new upload file.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// File size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Operations the item orchestrator needs from a remote file store.
pub trait FileStore: Send + Sync {
    /// Check a file against local constraints before anything is sent.
    fn validate_upload(&self, file: &UploadFile) -> Result<(), StorageError>;

    /// Upload a file, make it publicly readable, and return its identifier.
    fn upload(
        &self,
        file: &UploadFile,
    ) -> impl Future<Output = Result<FileId, StorageError>> + Send;

    /// Delete the file a stored reference points at.
    ///
    /// Blank or unparseable references are ignored.
    fn delete(&self, reference: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

enum Backend {
    Drive(DriveClient),
    Object(Operator),
}

/// Storage service for item files.
pub struct StorageService {
    backend: Backend,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.provider_name())
            .field("max_file_size", &self.config.max_file_size)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let backend = Self::create_backend(&config.provider)?;
        Ok(Self { backend, config })
    }

    fn create_backend(provider: &StorageProvider) -> Result<Backend, StorageError> {
        match provider {
            StorageProvider::GoogleDrive {
                client_email,
                private_key,
                credentials_file,
                access_token,
                token_uri,
                folder_id,
                api_base,
            } => {
                let client = if let Some(token) = access_token {
                    DriveClient::with_access_token(token.clone(), api_base.clone())?
                } else {
                    let key = match (credentials_file, client_email, private_key) {
                        (Some(path), _, _) => ServiceAccountKey::from_file(path)?,
                        (None, Some(email), Some(key)) => ServiceAccountKey::new(email.clone(), key),
                        _ => {
                            return Err(StorageError::configuration(
                                "google_drive needs credentials_file, client_email and private_key, or access_token",
                            ));
                        }
                    };
                    DriveClient::with_service_account(key, token_uri.clone(), api_base.clone())?
                };
                Ok(Backend::Drive(client.with_folder(folder_id.clone())))
            }
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Ok(Backend::Object(
                    Operator::new(builder)
                        .map_err(|e| StorageError::configuration(e.to_string()))?
                        .finish(),
                ))
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Ok(Backend::Object(
                    Operator::new(builder)
                        .map_err(|e| StorageError::configuration(e.to_string()))?
                        .finish(),
                ))
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Ok(Backend::Object(
                    Operator::new(builder)
                        .map_err(|e| StorageError::configuration(e.to_string()))?
                        .finish(),
                ))
            }
        }
    }

    /// Generate the object key for a file stored through OpenDAL.
    ///
    /// Format: `{uuid_v7}-{sanitized_filename}`
    #[must_use]
    pub fn generate_object_key(file_name: &str) -> String {
        format!("{}-{}", Uuid::now_v7(), sanitize_filename(file_name))
    }

    /// Check that the provider is reachable with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are rejected or the store is unreachable.
    pub async fn verify(&self) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Drive(client) => client.access_token().await.map(|_| ()),
            Backend::Object(operator) => operator
                .check()
                .await
                .map_err(|e| StorageError::operation(e.to_string())),
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider_name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    async fn write_object(
        operator: &Operator,
        file: &UploadFile,
    ) -> Result<FileId, StorageError> {
        let key = Self::generate_object_key(&file.file_name);
        let supports_content_type = operator.info().full_capability().write_with_content_type;

        let write = operator.write_with(&key, file.content.clone());
        let result = if supports_content_type {
            write.content_type(&file.content_type).await
        } else {
            write.await
        };
        result.map_err(|e| StorageError::upload(e.to_string()))?;

        Ok(key)
    }
}

impl FileStore for StorageService {
    fn validate_upload(&self, file: &UploadFile) -> Result<(), StorageError> {
        if file.content.is_empty() {
            return Err(StorageError::EmptyFile(file.file_name.clone()));
        }
        if file.size() > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                file.size(),
                self.config.max_file_size,
            ));
        }
        Ok(())
    }

    async fn upload(&self, file: &UploadFile) -> Result<FileId, StorageError> {
        self.validate_upload(file)?;

        let file_id = match &self.backend {
            Backend::Drive(client) => {
                let file_id = client.create_file(file).await?;
                client.grant_public_read(&file_id).await?;
                file_id
            }
            Backend::Object(operator) => Self::write_object(operator, file).await?,
        };

        info!(
            file_id = %file_id,
            size = file.size(),
            content_type = %file.content_type,
            provider = self.provider_name(),
            "File uploaded"
        );
        Ok(file_id)
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let Some(file_id) = parse_file_reference(reference) else {
            debug!(reference, "No file identifier in reference, skipping deletion");
            return Ok(());
        };

        match &self.backend {
            Backend::Drive(client) => client.delete_file(file_id).await?,
            Backend::Object(operator) => operator
                .delete(file_id)
                .await
                .map_err(|e| StorageError::delete(file_id, e.to_string()))?,
        }

        info!(file_id, provider = self.provider_name(), "File deleted");
        Ok(())
    }
}

/// Sanitize filename for storage.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local_service(max: u64) -> (StorageService, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StorageConfig::new(StorageProvider::LocalFs {
            root: dir.path().to_path_buf(),
        })
        .with_max_file_size(max);
        let service = StorageService::from_config(config).expect("should create service");
        (service, dir)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("sermon.mp3"), "sermon.mp3");
        assert_eq!(sanitize_filename("my file (1).mp3"), "my_file__1_.mp3");
        assert_eq!(sanitize_filename("test@#$%.png"), "test____.png");
        assert_eq!(sanitize_filename("日本語.mp3"), "___.mp3");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_generate_object_key() {
        let key = StorageService::generate_object_key("Sunday Service.mp3");
        assert!(key.ends_with("-Sunday_Service.mp3"));
        assert!(!key.contains('/'));
        assert_ne!(key, StorageService::generate_object_key("Sunday Service.mp3"));
    }

    #[test]
    fn test_validate_upload_size() {
        let (service, _dir) = local_service(8);

        assert!(service.validate_upload(&UploadFile::new("a.png", "image/png", "1234")).is_ok());

        let err = service
            .validate_upload(&UploadFile::new("a.png", "image/png", "123456789"))
            .unwrap_err();
        assert!(matches!(err, StorageError::FileTooLarge { size: 9, max: 8 }));
    }

    #[test]
    fn test_validate_upload_empty() {
        let (service, _dir) = local_service(8);
        let err = service
            .validate_upload(&UploadFile::new("a.png", "image/png", Bytes::new()))
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyFile(_)));
    }

    #[test]
    fn test_google_drive_requires_credentials() {
        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: Some("svc@example.com".into()),
            private_key: None,
            credentials_file: None,
            access_token: None,
            token_uri: "https://oauth2.googleapis.com/token".into(),
            folder_id: None,
            api_base: "https://www.googleapis.com".into(),
        });
        let err = StorageService::from_config(config).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_local_upload_then_delete() {
        let (service, dir) = local_service(1024);
        let file = UploadFile::new("cover art.png", "image/png", "not really a png");

        let file_id = service.upload(&file).await.expect("upload");
        let path = dir.path().join(&file_id);
        assert_eq!(std::fs::read(&path).expect("stored"), b"not really a png");

        service.delete(&file_id).await.expect("delete");
        assert!(!path.exists());

        // deleting again is harmless
        service.delete(&file_id).await.expect("idempotent delete");
    }

    #[tokio::test]
    async fn test_delete_ignores_blank_reference() {
        let (service, _dir) = local_service(1024);
        service.delete("").await.expect("blank is a no-op");
        service
            .delete("https://example.com/no-id-here")
            .await
            .expect("unparseable is a no-op");
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let (service, dir) = local_service(4);
        let err = service
            .upload(&UploadFile::new("big.mp3", "audio/mpeg", "0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileTooLarge { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 0);
    }

    #[tokio::test]
    async fn test_drive_backend_uploads_and_shares() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"1DriveId"}"#)
            .create_async()
            .await;
        let grant = server
            .mock("POST", "/drive/v3/files/1DriveId/permissions")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: None,
            private_key: None,
            credentials_file: None,
            access_token: Some("test-token".into()),
            token_uri: format!("{}/token", server.url()),
            folder_id: None,
            api_base: server.url(),
        });
        let service = StorageService::from_config(config).expect("service");

        let file_id = service
            .upload(&UploadFile::new("cover.png", "image/png", "png"))
            .await
            .expect("upload");
        assert_eq!(file_id, "1DriveId");
        create.assert_async().await;
        grant.assert_async().await;
    }

    #[tokio::test]
    async fn test_drive_backend_permission_failure() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/upload/drive/v3/files")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"1DriveId"}"#)
            .create_async()
            .await;
        let _grant = server
            .mock("POST", "/drive/v3/files/1DriveId/permissions")
            .with_status(403)
            .create_async()
            .await;

        let config = StorageConfig::new(StorageProvider::GoogleDrive {
            client_email: None,
            private_key: None,
            credentials_file: None,
            access_token: Some("test-token".into()),
            token_uri: format!("{}/token", server.url()),
            folder_id: None,
            api_base: server.url(),
        });
        let service = StorageService::from_config(config).expect("service");

        let err = service
            .upload(&UploadFile::new("cover.png", "image/png", "png"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Permission { .. }));
    }
}
