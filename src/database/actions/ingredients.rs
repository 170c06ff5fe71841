use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use crate::{error::StoreError, schema::Ingredient};

/// Catalog of ingredients that recipes reference by id.
#[async_trait]
pub trait IngredientStore: Send + Sync {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the name is already taken.
    async fn create_ingredient(&self, ingredient: Ingredient) -> Result<Ingredient, StoreError>;
}

#[derive(Clone, Debug)]
pub struct SqliteIngredientStore {
    pool: Pool<Sqlite>,
}

impl SqliteIngredientStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngredientStore for SqliteIngredientStore {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, StoreError> {
        let list: Vec<Ingredient> =
            sqlx::query_as("SELECT id, name FROM ingredients ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(list)
    }

    async fn create_ingredient(&self, ingredient: Ingredient) -> Result<Ingredient, StoreError> {
        let mut tr = self.pool.begin().await?;

        sqlx::query("INSERT INTO ingredients (id, name) VALUES ($1, $2)")
            .bind(&ingredient.id)
            .bind(&ingredient.name)
            .execute(&mut *tr)
            .await
            .map_err(|e| {
                StoreError::unique_as_conflict(e, "ingredient with that name already exists")
            })?;

        tr.commit().await?;
        log::debug!("> Created ingredient {} ({})", ingredient.name, ingredient.id);

        Ok(ingredient)
    }
}
