use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RecipeId = String;

/// Recipe aggregate: the `recipes` root row plus its three association groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    pub id: RecipeId,
    pub slug: String,
    pub name: String,
    pub servings: i64,
    pub prep_time_seconds: i64,
    pub cook_time_seconds: i64,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<Instruction>,
    pub tags: Vec<Tag>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Recipe {
    pub fn from_row(
        row: RecipeRow,
        ingredients: Vec<RecipeIngredient>,
        instructions: Vec<Instruction>,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            servings: row.servings,
            prep_time_seconds: row.prep_time_seconds,
            cook_time_seconds: row.cook_time_seconds,
            ingredients,
            instructions,
            tags,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: RecipeId,
    pub slug: String,
    pub name: String,
    pub servings: i64,
    pub prep_time_seconds: i64,
    pub cook_time_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog ingredient as used by one recipe. `id` references `ingredients`;
/// `name` is resolved from the catalog on read and ignored on write.
#[derive(sqlx::FromRow, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeIngredient {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub note: String,
}

#[derive(sqlx::FromRow, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instruction {
    pub id: String,
    pub step_number: i64,
    pub description: String,
}

#[derive(sqlx::FromRow, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Catalog entry in `ingredients`, independent of any recipe.
#[derive(sqlx::FromRow, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
}

/// Association rows keyed by the recipe they belong to, as returned by the
/// bulk queries behind `list_recipes`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedIngredient {
    pub recipe_id: RecipeId,
    #[sqlx(flatten)]
    pub ingredient: RecipeIngredient,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedInstruction {
    pub recipe_id: RecipeId,
    #[sqlx(flatten)]
    pub instruction: Instruction,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedTag {
    pub recipe_id: RecipeId,
    #[sqlx(flatten)]
    pub tag: Tag,
}
