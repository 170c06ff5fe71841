use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use super::associations::{
    insert_recipe_ingredients, insert_recipe_instructions, insert_recipe_tags,
    list_all_recipe_ingredients, list_all_recipe_instructions, list_all_recipe_tags,
    list_recipe_ingredients, list_recipe_instructions, list_recipe_tags,
    replace_recipe_ingredients, replace_recipe_instructions, replace_recipe_tags,
};
use crate::{
    error::StoreError,
    schema::{Recipe, RecipeRow},
};

const RECIPE_COLUMNS: &str =
    "id, slug, name, servings, prep_time_seconds, cook_time_seconds, created_at, updated_at";

/// Persistence contract for recipe aggregates.
///
/// Every call runs in its own transaction: a failed create or update leaves no
/// trace, and reads never observe a half-written aggregate.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// All recipes ordered by name, each with its collections resolved.
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Writes the root row and every association row. Echoes the input on success.
    async fn create_recipe(&self, recipe: Recipe) -> Result<Recipe, StoreError>;

    /// `Ok(None)` when no recipe has this id.
    async fn get_recipe_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError>;

    /// Overwrites the scalar fields and replaces all three collections.
    /// Fails with [`StoreError::NotFound`] when the recipe does not exist.
    async fn update_recipe(&self, recipe: Recipe) -> Result<Recipe, StoreError>;

    /// Removes the root row; association rows go with it through the schema's cascades.
    async fn delete_recipe(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Debug)]
pub struct SqliteRecipeStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecipeStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut tr = self.pool.begin().await?;

        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY name ASC, id ASC"
        ))
        .fetch_all(&mut *tr)
        .await?;

        let mut ingredients = list_all_recipe_ingredients(&mut tr).await?;
        let mut instructions = list_all_recipe_instructions(&mut tr).await?;
        let mut tags = list_all_recipe_tags(&mut tr).await?;

        tr.commit().await?;

        let recipes = rows
            .into_iter()
            .map(|row| {
                let ingredients = ingredients.remove(&row.id).unwrap_or_default();
                let instructions = instructions.remove(&row.id).unwrap_or_default();
                let tags = tags.remove(&row.id).unwrap_or_default();

                Recipe::from_row(row, ingredients, instructions, tags)
            })
            .collect();

        Ok(recipes)
    }

    async fn create_recipe(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        let mut tr = self.pool.begin().await?;

        sqlx::query(
            "
            INSERT INTO recipes (id, slug, name, servings, prep_time_seconds, cook_time_seconds)
            VALUES ($1, $2, $3, $4, $5, $6)
        ",
        )
        .bind(&recipe.id)
        .bind(&recipe.slug)
        .bind(&recipe.name)
        .bind(recipe.servings)
        .bind(recipe.prep_time_seconds)
        .bind(recipe.cook_time_seconds)
        .execute(&mut *tr)
        .await?;

        insert_recipe_ingredients(&mut tr, &recipe.id, &recipe.ingredients).await?;
        insert_recipe_instructions(&mut tr, &recipe.id, &recipe.instructions).await?;
        insert_recipe_tags(&mut tr, &recipe.id, &recipe.tags).await?;

        tr.commit().await?;
        log::debug!(
            "> Created recipe {} ({} ingredients, {} instructions, {} tags)",
            recipe.id,
            recipe.ingredients.len(),
            recipe.instructions.len(),
            recipe.tags.len()
        );

        Ok(recipe)
    }

    async fn get_recipe_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        let mut tr = self.pool.begin().await?;

        let row: Option<RecipeRow> =
            sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *tr)
                .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let ingredients = list_recipe_ingredients(&mut tr, id).await?;
        let instructions = list_recipe_instructions(&mut tr, id).await?;
        let tags = list_recipe_tags(&mut tr, id).await?;

        tr.commit().await?;

        Ok(Some(Recipe::from_row(row, ingredients, instructions, tags)))
    }

    async fn update_recipe(&self, recipe: Recipe) -> Result<Recipe, StoreError> {
        let mut tr = self.pool.begin().await?;

        let result = sqlx::query(
            "
            UPDATE recipes
            SET name = $1, servings = $2, prep_time_seconds = $3, cook_time_seconds = $4
            WHERE id = $5
        ",
        )
        .bind(&recipe.name)
        .bind(recipe.servings)
        .bind(recipe.prep_time_seconds)
        .bind(recipe.cook_time_seconds)
        .bind(&recipe.id)
        .execute(&mut *tr)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        replace_recipe_ingredients(&mut tr, &recipe.id, &recipe.ingredients).await?;
        replace_recipe_instructions(&mut tr, &recipe.id, &recipe.instructions).await?;
        replace_recipe_tags(&mut tr, &recipe.id, &recipe.tags).await?;

        tr.commit().await?;
        log::debug!("> Updated recipe {}", recipe.id);

        Ok(recipe)
    }

    async fn delete_recipe(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        log::debug!("> Deleted recipe {id}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pool::memory_pool,
        schema::{Instruction, RecipeIngredient, Tag},
    };

    async fn seed_catalog(pool: &Pool<Sqlite>) {
        sqlx::query(
            "INSERT INTO ingredients (id, name) VALUES ('i1', 'Flour'), ('i2', 'Milk'), ('i3', 'Egg')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO tags (id, name) VALUES ('t1', 'breakfast'), ('t2', 'sweet')")
            .execute(pool)
            .await
            .unwrap();
    }

    async fn store() -> (SqliteRecipeStore, Pool<Sqlite>) {
        let pool = memory_pool().await;
        seed_catalog(&pool).await;
        (SqliteRecipeStore::new(pool.clone()), pool)
    }

    fn ingredient(id: &str, quantity: f64, unit: &str) -> RecipeIngredient {
        RecipeIngredient {
            id: id.into(),
            quantity,
            unit: unit.into(),
            ..Default::default()
        }
    }

    fn instruction(id: &str, step_number: i64, description: &str) -> Instruction {
        Instruction {
            id: id.into(),
            step_number,
            description: description.into(),
        }
    }

    fn tag(id: &str) -> Tag {
        Tag {
            id: id.into(),
            ..Default::default()
        }
    }

    fn pancakes() -> Recipe {
        Recipe {
            id: "r1".into(),
            slug: "pancakes".into(),
            name: "Pancakes".into(),
            servings: 4,
            prep_time_seconds: 600,
            cook_time_seconds: 900,
            ingredients: vec![ingredient("i1", 2.0, "cup")],
            instructions: vec![instruction("s1", 1, "Mix")],
            tags: vec![tag("t1")],
            ..Default::default()
        }
    }

    fn named(id: &str, name: &str) -> Recipe {
        Recipe {
            id: id.into(),
            slug: name.to_lowercase(),
            name: name.into(),
            ..Default::default()
        }
    }

    async fn association_rows(pool: &Pool<Sqlite>, recipe_id: &str) -> i64 {
        let count: (i64,) = sqlx::query_as(
            "
            SELECT (SELECT COUNT(*) FROM recipe_ingredient WHERE recipe_id = $1)
                 + (SELECT COUNT(*) FROM instructions WHERE recipe_id = $1)
                 + (SELECT COUNT(*) FROM recipe_tag WHERE recipe_id = $1)
        ",
        )
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .unwrap();
        count.0
    }

    #[tokio::test]
    async fn created_recipe_reads_back_with_its_collections() {
        let (store, _pool) = store().await;

        let created = store.create_recipe(pancakes()).await.unwrap();
        assert_eq!(created, pancakes());

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Pancakes");
        assert_eq!(fetched.slug, "pancakes");
        assert_eq!(fetched.servings, 4);
        assert_eq!(fetched.prep_time_seconds, 600);
        assert_eq!(fetched.cook_time_seconds, 900);
        assert_eq!(
            fetched.ingredients,
            vec![RecipeIngredient {
                name: "Flour".into(),
                ..ingredient("i1", 2.0, "cup")
            }]
        );
        assert_eq!(fetched.instructions, vec![instruction("s1", 1, "Mix")]);
        assert_eq!(
            fetched.tags,
            vec![Tag {
                id: "t1".into(),
                name: "breakfast".into()
            }]
        );
        assert!(fetched.created_at.is_some());
        assert!(fetched.updated_at.is_some());
    }

    #[tokio::test]
    async fn same_ingredient_keeps_a_row_per_use() {
        let (store, _pool) = store().await;

        let recipe = Recipe {
            ingredients: vec![
                RecipeIngredient {
                    note: "for the batter".into(),
                    ..ingredient("i1", 2.0, "cup")
                },
                ingredient("i2", 1.0, "cup"),
                RecipeIngredient {
                    note: "for dusting".into(),
                    ..ingredient("i1", 1.0, "tbsp")
                },
            ],
            ..pancakes()
        };
        store.create_recipe(recipe).await.unwrap();

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        let uses: Vec<(&str, f64, &str, &str)> = fetched
            .ingredients
            .iter()
            .map(|i| (i.id.as_str(), i.quantity, i.unit.as_str(), i.note.as_str()))
            .collect();
        assert_eq!(
            uses,
            vec![
                ("i1", 2.0, "cup", "for the batter"),
                ("i2", 1.0, "cup", ""),
                ("i1", 1.0, "tbsp", "for dusting"),
            ]
        );
        assert_eq!(fetched.ingredients[2].name, "Flour");
    }

    #[tokio::test]
    async fn unknown_recipe_is_none() {
        let (store, _pool) = store().await;

        assert!(store.get_recipe_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn instructions_come_back_in_step_order() {
        let (store, _pool) = store().await;

        let recipe = Recipe {
            instructions: vec![
                instruction("s3", 3, "Serve"),
                instruction("s1", 1, "Mix"),
                instruction("s2", 2, "Fry"),
            ],
            ..pancakes()
        };
        store.create_recipe(recipe).await.unwrap();

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        let steps: Vec<i64> = fetched.instructions.iter().map(|i| i.step_number).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn update_replaces_associations_instead_of_merging() {
        let (store, _pool) = store().await;

        let recipe = Recipe {
            ingredients: vec![ingredient("i1", 2.0, "cup"), ingredient("i2", 1.0, "cup")],
            ..pancakes()
        };
        store.create_recipe(recipe).await.unwrap();

        let update = Recipe {
            name: "Egg pancakes".into(),
            servings: 2,
            ingredients: vec![ingredient("i3", 3.0, "pcs")],
            instructions: vec![instruction("s1", 1, "Whisk"), instruction("s2", 2, "Fry")],
            tags: vec![tag("t2")],
            ..pancakes()
        };
        let updated = store.update_recipe(update.clone()).await.unwrap();
        assert_eq!(updated, update);

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Egg pancakes");
        assert_eq!(fetched.servings, 2);
        let ingredient_ids: Vec<&str> = fetched.ingredients.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ingredient_ids, vec!["i3"]);
        assert_eq!(
            fetched.instructions,
            vec![instruction("s1", 1, "Whisk"), instruction("s2", 2, "Fry")]
        );
        let tag_names: Vec<&str> = fetched.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["sweet"]);
    }

    #[tokio::test]
    async fn update_with_empty_collections_clears_them() {
        let (store, pool) = store().await;
        store.create_recipe(pancakes()).await.unwrap();

        let update = Recipe {
            ingredients: vec![],
            instructions: vec![],
            tags: vec![],
            ..pancakes()
        };
        store.update_recipe(update).await.unwrap();

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        assert!(fetched.ingredients.is_empty());
        assert!(fetched.instructions.is_empty());
        assert!(fetched.tags.is_empty());
        assert_eq!(association_rows(&pool, "r1").await, 0);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_recipe_are_not_found() {
        let (store, _pool) = store().await;

        let error = store.update_recipe(pancakes()).await.unwrap_err();
        assert!(error.is_not_found());

        let error = store.delete_recipe("r1").await.unwrap_err();
        assert!(error.is_not_found());

        assert!(store.list_recipes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_association_rows() {
        let (store, pool) = store().await;
        store.create_recipe(pancakes()).await.unwrap();
        assert_eq!(association_rows(&pool, "r1").await, 3);

        store.delete_recipe("r1").await.unwrap();

        assert!(store.get_recipe_by_id("r1").await.unwrap().is_none());
        assert_eq!(association_rows(&pool, "r1").await, 0);
    }

    #[tokio::test]
    async fn list_is_ordered_by_name_with_collections_resolved() {
        let (store, _pool) = store().await;

        store.create_recipe(named("rb", "B")).await.unwrap();
        store
            .create_recipe(Recipe {
                tags: vec![tag("t2"), tag("t1")],
                ..named("ra", "A")
            })
            .await
            .unwrap();
        store
            .create_recipe(Recipe {
                ingredients: vec![ingredient("i2", 0.5, "l")],
                instructions: vec![instruction("c2", 2, "Stir"), instruction("c1", 1, "Pour")],
                ..named("rc", "C")
            })
            .await
            .unwrap();

        let recipes = store.list_recipes().await.unwrap();
        let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let tag_names: Vec<&str> = recipes[0].tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["sweet", "breakfast"]);
        assert!(recipes[0].ingredients.is_empty());

        assert!(recipes[1].ingredients.is_empty());
        assert!(recipes[1].instructions.is_empty());
        assert!(recipes[1].tags.is_empty());

        assert_eq!(recipes[2].ingredients[0].name, "Milk");
        let steps: Vec<&str> = recipes[2].instructions.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(steps, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_rows_behind() {
        let (store, pool) = store().await;

        let recipe = Recipe {
            tags: vec![tag("t1"), tag("no-such-tag")],
            ..pancakes()
        };
        let error = store.create_recipe(recipe).await.unwrap_err();
        assert!(error.is_foreign_key_violation());

        assert!(store.get_recipe_by_id("r1").await.unwrap().is_none());
        assert_eq!(association_rows(&pool, "r1").await, 0);
    }

    #[tokio::test]
    async fn failed_update_rolls_back_scalar_changes() {
        let (store, _pool) = store().await;
        store.create_recipe(pancakes()).await.unwrap();

        let update = Recipe {
            name: "Renamed".into(),
            ingredients: vec![ingredient("no-such-ingredient", 1.0, "cup")],
            ..pancakes()
        };
        let error = store.update_recipe(update).await.unwrap_err();
        assert!(matches!(error, StoreError::Storage(_)));

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Pancakes");
        assert_eq!(fetched.ingredients.len(), 1);
        assert_eq!(fetched.ingredients[0].id, "i1");
    }

    #[tokio::test]
    async fn duplicate_recipe_id_is_a_storage_fault() {
        let (store, _pool) = store().await;
        store.create_recipe(pancakes()).await.unwrap();

        let duplicate = Recipe {
            name: "Waffles".into(),
            ..pancakes()
        };
        let error = store.create_recipe(duplicate).await.unwrap_err();
        assert!(matches!(error, StoreError::Storage(_)));
        assert!(error.is_unique_violation());

        let fetched = store.get_recipe_by_id("r1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Pancakes");
        assert_eq!(fetched.ingredients.len(), 1);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_storage_faults() {
        let (store, pool) = store().await;
        pool.close().await;

        assert!(matches!(
            store.list_recipes().await,
            Err(StoreError::Storage(_))
        ));
        assert!(matches!(
            store.get_recipe_by_id("r1").await,
            Err(StoreError::Storage(_))
        ));
        assert!(matches!(
            store.delete_recipe("r1").await,
            Err(StoreError::Storage(_))
        ));
    }
}
