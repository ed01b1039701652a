//! Item service implementation.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use lectern_shared::types::ItemId;
use tracing::{error, info, warn};

use super::error::ItemError;
use super::types::{FileSlot, Item, ItemFields, ItemFiles, ItemPatch, NewItem};
use crate::storage::{FileId, FileStore};

/// Repository trait for item persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ItemRepository: Send + Sync {
    /// List every item, newest date first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Item>, ItemError>> + Send;

    /// Find item by ID.
    fn find_by_id(
        &self,
        id: ItemId,
    ) -> impl Future<Output = Result<Option<Item>, ItemError>> + Send;

    /// Load an item, failing with `NotFound` when it does not exist.
    fn get_by_id(&self, id: ItemId) -> impl Future<Output = Result<Item, ItemError>> + Send {
        async move {
            self.find_by_id(id)
                .await?
                .ok_or_else(|| ItemError::not_found(id))
        }
    }

    /// Create a new item record.
    fn create(&self, item: NewItem) -> impl Future<Output = Result<Item, ItemError>> + Send;

    /// Apply a sparse update and return the stored result.
    fn update(
        &self,
        id: ItemId,
        patch: ItemPatch,
    ) -> impl Future<Output = Result<Item, ItemError>> + Send;

    /// Delete item by ID. Returns whether a record was removed.
    fn delete_by_id(&self, id: ItemId) -> impl Future<Output = Result<bool, ItemError>> + Send;
}

/// Item service coordinating the metadata repository and the remote file store.
pub struct ItemService<R: ItemRepository, S: FileStore> {
    store: Arc<S>,
    repo: Arc<R>,
}

impl<R: ItemRepository, S: FileStore> ItemService<R, S> {
    /// Create a new item service.
    #[must_use]
    pub fn new(store: Arc<S>, repo: Arc<R>) -> Self {
        Self { store, repo }
    }

    /// List all items.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(&self) -> Result<Vec<Item>, ItemError> {
        self.repo.list_all().await
    }

    /// Get a single item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or malformed ids.
    pub async fn get(&self, id: &str) -> Result<Item, ItemError> {
        let id = parse_id(id)?;
        self.repo.get_by_id(id).await
    }

    /// Create an item, uploading its files first.
    ///
    /// Files uploaded by this call are removed again if a later step fails.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The date cannot be parsed
    /// - A file is empty or too large
    /// - The remote store or the repository fails
    pub async fn create(&self, fields: ItemFields, files: ItemFiles) -> Result<Item, ItemError> {
        let mut new_item = fields.into_new_item(Utc::now())?;
        self.validate_files(&files)?;

        let uploaded = self.upload_files(&files).await?;
        for (slot, file_id) in &uploaded {
            match slot {
                FileSlot::Thumbnail => new_item.thumbnail = Some(file_id.clone()),
                FileSlot::AudioFile => new_item.audio_file = Some(file_id.clone()),
            }
        }

        match self.repo.create(new_item).await {
            Ok(item) => {
                info!(item_id = %item.id, files = uploaded.len(), "Item created");
                Ok(item)
            }
            Err(e) => {
                error!(error = %e, "Failed to save item, removing uploaded files");
                self.discard(&uploaded).await;
                Err(e)
            }
        }
    }

    /// Edit an item.
    ///
    /// Replacement files are uploaded and swapped into the record before the
    /// old remote files are deleted, so the record never points at a missing
    /// file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The item does not exist
    /// - The date cannot be parsed
    /// - A file is empty or too large
    /// - The remote store or the repository fails
    pub async fn edit(
        &self,
        id: &str,
        fields: ItemFields,
        files: ItemFiles,
    ) -> Result<Item, ItemError> {
        let id = parse_id(id)?;
        let existing = self.repo.get_by_id(id).await?;

        let mut patch = fields.into_patch()?;
        self.validate_files(&files)?;

        let uploaded = self.upload_files(&files).await?;
        for (slot, file_id) in &uploaded {
            patch.set_file(*slot, file_id.clone());
        }

        if patch.is_empty() {
            return Ok(existing);
        }

        let updated = match self.repo.update(id, patch).await {
            Ok(item) => item,
            Err(e) => {
                error!(item_id = %id, error = %e, "Failed to update item, removing uploaded files");
                self.discard(&uploaded).await;
                return Err(e);
            }
        };

        for (slot, _) in &uploaded {
            let Some(old) = existing.file(*slot) else {
                continue;
            };
            if updated.file(*slot) == Some(old) {
                continue;
            }
            if let Err(e) = self.store.delete(old).await {
                warn!(
                    item_id = %id,
                    file_id = %old,
                    error = %e,
                    "Failed to delete replaced file"
                );
            }
        }

        info!(item_id = %id, files = uploaded.len(), "Item updated");
        Ok(updated)
    }

    /// Delete an item and its remote files.
    ///
    /// The record goes first, so it never points at a removed file. Remote
    /// files that cannot be deleted afterwards are logged and left behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or the repository fails.
    pub async fn delete(&self, id: &str) -> Result<(), ItemError> {
        let id = parse_id(id)?;
        let existing = self.repo.get_by_id(id).await?;

        if !self.repo.delete_by_id(id).await? {
            return Err(ItemError::not_found(id));
        }

        for slot in FileSlot::ALL {
            let Some(reference) = existing.file(slot) else {
                continue;
            };
            if let Err(e) = self.store.delete(reference).await {
                warn!(
                    item_id = %id,
                    file_id = %reference,
                    error = %e,
                    "Failed to delete file of removed item"
                );
            }
        }

        info!(item_id = %id, "Item deleted");
        Ok(())
    }

    fn validate_files(&self, files: &ItemFiles) -> Result<(), ItemError> {
        for (_, file) in files.iter() {
            self.store.validate_upload(file)?;
        }
        Ok(())
    }

    /// Upload files in slot order. On failure, files uploaded so far are discarded.
    async fn upload_files(&self, files: &ItemFiles) -> Result<Vec<(FileSlot, FileId)>, ItemError> {
        let mut uploaded = Vec::new();
        for (slot, file) in files.iter() {
            match self.store.upload(file).await {
                Ok(file_id) => uploaded.push((slot, file_id)),
                Err(e) => {
                    error!(
                        field = slot.field_name(),
                        filename = %file.file_name,
                        error = %e,
                        "Upload failed"
                    );
                    self.discard(&uploaded).await;
                    return Err(e.into());
                }
            }
        }
        Ok(uploaded)
    }

    async fn discard(&self, uploaded: &[(FileSlot, FileId)]) {
        for (_, file_id) in uploaded {
            if let Err(e) = self.store.delete(file_id).await {
                warn!(file_id = %file_id, error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}

fn parse_id(id: &str) -> Result<ItemId, ItemError> {
    id.parse().map_err(|_| ItemError::not_found(id))
}
