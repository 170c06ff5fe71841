use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use crate::{error::StoreError, schema::Tag};

/// Append-only tag catalog.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the name is already taken.
    async fn create_tag(&self, tag: Tag) -> Result<Tag, StoreError>;
}

#[derive(Clone, Debug)]
pub struct SqliteTagStore {
    pool: Pool<Sqlite>,
}

impl SqliteTagStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let list: Vec<Tag> = sqlx::query_as("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(list)
    }

    async fn create_tag(&self, tag: Tag) -> Result<Tag, StoreError> {
        let mut tr = self.pool.begin().await?;

        sqlx::query("INSERT INTO tags (id, name) VALUES ($1, $2)")
            .bind(&tag.id)
            .bind(&tag.name)
            .execute(&mut *tr)
            .await
            .map_err(|e| StoreError::unique_as_conflict(e, "tag with that name already exists"))?;

        tr.commit().await?;
        log::debug!("> Created tag {} ({})", tag.name, tag.id);

        Ok(tag)
    }
}
