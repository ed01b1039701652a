//! Google Drive v3 REST client.
//!
//! Files are created with a `multipart/related` upload, shared with
//! `anyone`/`reader`, and deleted by identifier. Service accounts authenticate
//! with a signed JWT assertion exchanged for a short-lived access token.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::error::StorageError;
use super::service::UploadFile;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Service-account credentials, as found in a downloaded JSON key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account e-mail address.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Token endpoint, when the key file names one.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[hidden]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Build a key from separate environment-style fields.
    ///
    /// Private keys pasted into environment variables usually carry literal
    /// `\n` sequences instead of line breaks; those are restored here.
    #[must_use]
    pub fn new(client_email: impl Into<String>, private_key: &str) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.replace("\\n", "\n"),
            token_uri: None,
        }
    }

    /// Read a service-account JSON key file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::configuration(format!("invalid key file {}: {e}", path.display()))
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

enum DriveAuth {
    Static(String),
    ServiceAccount {
        client_email: String,
        token_uri: String,
        encoding_key: EncodingKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Google Drive REST client.
pub struct DriveClient {
    http: reqwest::Client,
    auth: DriveAuth,
    api_base: String,
    folder_id: Option<String>,
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.auth {
            DriveAuth::Static(_) => "static_token",
            DriveAuth::ServiceAccount { .. } => "service_account",
        };
        f.debug_struct("DriveClient")
            .field("auth", &auth)
            .field("api_base", &self.api_base)
            .field("folder_id", &self.folder_id)
            .finish_non_exhaustive()
    }
}

impl DriveClient {
    /// Create a client that authenticates as a service account.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is not a valid RSA PEM key.
    pub fn with_service_account(
        key: ServiceAccountKey,
        token_uri: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StorageError::configuration(format!("invalid private key: {e}")))?;
        let token_uri = key.token_uri.unwrap_or_else(|| token_uri.into());

        Ok(Self {
            http: build_http_client()?,
            auth: DriveAuth::ServiceAccount {
                client_email: key.client_email,
                token_uri,
                encoding_key,
                cached: Mutex::new(None),
            },
            api_base: trim_base(api_base.into()),
            folder_id: None,
        })
    }

    /// Create a client that sends a fixed access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_access_token(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            http: build_http_client()?,
            auth: DriveAuth::Static(token.into()),
            api_base: trim_base(api_base.into()),
            folder_id: None,
        })
    }

    /// Put new uploads into the given folder.
    #[must_use]
    pub fn with_folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = folder_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Obtain a valid access token, refreshing the cached one when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the assertion.
    pub async fn access_token(&self) -> Result<String, StorageError> {
        match &self.auth {
            DriveAuth::Static(token) => Ok(token.clone()),
            DriveAuth::ServiceAccount {
                client_email,
                token_uri,
                encoding_key,
                cached,
            } => {
                let mut guard = cached.lock().await;
                let now = Utc::now();
                if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(now)) {
                    return Ok(token.value.clone());
                }

                let assertion = sign_assertion(client_email, token_uri, encoding_key, now)?;
                let response = self
                    .http
                    .post(token_uri.as_str())
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()
                    .await
                    .map_err(|e| StorageError::auth(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(StorageError::auth(format!("{status}: {body}")));
                }

                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| StorageError::auth(format!("invalid token response: {e}")))?;

                debug!(expires_in = token.expires_in, "Obtained Google Drive access token");
                let fresh = CachedToken {
                    value: token.access_token,
                    expires_at: now + chrono::Duration::seconds(token.expires_in),
                };
                let value = fresh.value.clone();
                *guard = Some(fresh);
                Ok(value)
            }
        }
    }

    /// Create a file and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Upload` if Drive rejects the file.
    pub async fn create_file(&self, file: &UploadFile) -> Result<String, StorageError> {
        let token = self.access_token().await?;
        let boundary = format!("lectern-{}", Uuid::new_v4().simple());

        let mut metadata = json!({
            "name": file.file_name,
            "mimeType": file.content_type,
        });
        if let Some(folder) = &self.folder_id {
            metadata["parents"] = json!([folder]);
        }

        let body = multipart_related_body(&boundary, &metadata, &file.content_type, &file.content);
        let response = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload(format!("{status}: {body}")));
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| StorageError::upload(format!("invalid create response: {e}")))?;
        Ok(created.id)
    }

    /// Let anyone with the identifier read the file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Permission` if Drive rejects the grant.
    pub async fn grant_public_read(&self, file_id: &str) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.file_url(file_id, &["permissions"])?)
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| StorageError::permission(file_id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::permission(file_id, format!("{status}: {body}")));
        }
        Ok(())
    }

    /// Delete a file. A file that no longer exists counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Delete` if Drive rejects the deletion.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(self.file_url(file_id, &[])?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::delete(file_id, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(file_id, "Drive file already gone");
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::delete(file_id, format!("{status}: {body}")));
        }
        Ok(())
    }

    /// `{api_base}/drive/v3/files/{file_id}/{trailing..}` with `file_id` as a
    /// single encoded path segment.
    fn file_url(&self, file_id: &str, trailing: &[&str]) -> Result<Url, StorageError> {
        let mut url = Url::parse(&format!("{}/drive/v3/files", self.api_base))
            .map_err(|e| StorageError::configuration(format!("invalid Drive API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StorageError::configuration("Drive API base cannot hold a path"))?
            .push(file_id)
            .extend(trailing);
        Ok(url)
    }
}

fn build_http_client() -> Result<reqwest::Client, StorageError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| StorageError::configuration(format!("cannot build HTTP client: {e}")))
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn sign_assertion(
    client_email: &str,
    token_uri: &str,
    encoding_key: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<String, StorageError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: client_email,
        scope: DRIVE_SCOPE,
        aud: token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, encoding_key)
        .map_err(|e| StorageError::auth(format!("cannot sign assertion: {e}")))
}

fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    content: &Bytes,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(
        format!("\r\n--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
