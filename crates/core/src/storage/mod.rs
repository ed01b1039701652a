//! Remote file store client.
//!
//! Uploads item files to a cloud provider, makes them publicly readable and
//! deletes them again. Each stored object is addressed by an opaque file
//! identifier issued at upload time.
//!
//! # Providers
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────┐
//! │ Google Drive (REST v3)       │ OpenDAL operator                     │
//! │ files.create (multipart)     │ op.write("{uuid}-{name}", data)      │
//! │ permissions.create (anyone)  │ public read = bucket policy          │
//! │ files.delete                 │ op.delete(key)                       │
//! └──────────────────────────────┴──────────────────────────────────────┘
//! ```

mod config;
mod drive;
mod error;
mod reference;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use drive::{DriveClient, ServiceAccountKey};
pub use error::StorageError;
pub use reference::parse_file_reference;
pub use service::{FileId, FileStore, StorageService, UploadFile};
