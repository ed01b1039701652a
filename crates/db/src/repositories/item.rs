//! Item repository for database operations.
//!
//! Implements item CRUD operations using SeaORM.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::items;
use lectern_core::item::{Item, ItemError, ItemPatch, ItemRepository as ItemRepoTrait, NewItem};
use lectern_shared::types::ItemId;

/// Item repository implementation.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    db: DatabaseConnection,
}

impl ItemRepository {
    /// Create a new item repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ItemRepoTrait for ItemRepository {
    async fn list_all(&self) -> Result<Vec<Item>, ItemError> {
        let models = items::Entity::find()
            .order_by_desc(items::Column::Date)
            .order_by_desc(items::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, ItemError> {
        let model = items::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(model.map(to_domain))
    }

    async fn create(&self, input: NewItem) -> Result<Item, ItemError> {
        let now = Utc::now();
        let active_model = items::ActiveModel {
            id: Set(ItemId::new().into_inner()),
            name: Set(input.name),
            date: Set(input.date.into()),
            speaker: Set(input.speaker),
            series: Set(input.series),
            thumbnail: Set(input.thumbnail),
            audio_file: Set(input.audio_file),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(to_domain(model))
    }

    async fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Item, ItemError> {
        let model = items::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| ItemError::not_found(id))?;

        let mut active_model: items::ActiveModel = model.into();
        if let Some(name) = patch.name {
            active_model.name = Set(Some(name));
        }
        if let Some(date) = patch.date {
            active_model.date = Set(date.into());
        }
        if let Some(speaker) = patch.speaker {
            active_model.speaker = Set(Some(speaker));
        }
        if let Some(series) = patch.series {
            active_model.series = Set(Some(series));
        }
        if let Some(thumbnail) = patch.thumbnail {
            active_model.thumbnail = Set(Some(thumbnail));
        }
        if let Some(audio_file) = patch.audio_file {
            active_model.audio_file = Set(Some(audio_file));
        }
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => ItemError::not_found(id),
            other => repository_error(other),
        })?;

        Ok(to_domain(model))
    }

    async fn delete_by_id(&self, id: ItemId) -> Result<bool, ItemError> {
        let result = items::Entity::delete_many()
            .filter(items::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(repository_error)?;

        Ok(result.rows_affected > 0)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn repository_error(e: DbErr) -> ItemError {
    ItemError::repository(e.to_string())
}

/// Convert database model to domain model.
fn to_domain(model: items::Model) -> Item {
    Item {
        id: ItemId::from_uuid(model.id),
        name: model.name,
        date: model.date.with_timezone(&Utc),
        speaker: model.speaker,
        series: model.series,
        thumbnail: model.thumbnail,
        audio_file: model.audio_file,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
