//! Items table.
//!
//! One row per sermon with bare remote file identifiers for its two files.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ITEMS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS items CASCADE;")
            .await?;
        Ok(())
    }
}

const ITEMS_SQL: &str = r"
CREATE TABLE items (
    id UUID PRIMARY KEY,
    name TEXT,
    date TIMESTAMPTZ NOT NULL DEFAULT now(),
    speaker TEXT,
    series TEXT,
    thumbnail TEXT,
    audio_file TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Listing order: newest sermon first
CREATE INDEX idx_items_date ON items(date DESC, created_at DESC);

-- Browsing by series
CREATE INDEX idx_items_series ON items(series) WHERE series IS NOT NULL;
";
