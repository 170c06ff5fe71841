//! Query groups for the three collections owned by a recipe.
//!
//! Each group reads its rows for one recipe, reads them for every recipe at
//! once (grouped by recipe id), and replaces them wholesale. Everything takes
//! a bare connection so the caller decides which transaction it runs in.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::SQLITE_BIND_LIMIT,
    schema::{
        Instruction, LinkedIngredient, LinkedInstruction, LinkedTag, RecipeId, RecipeIngredient,
        Tag,
    },
};

fn group_by_recipe<L, T>(
    rows: Vec<L>,
    split: impl Fn(L) -> (RecipeId, T),
) -> HashMap<RecipeId, Vec<T>> {
    let mut map: HashMap<RecipeId, Vec<T>> = HashMap::new();
    rows.into_iter().map(split).for_each(|(recipe_id, item)| {
        map.entry(recipe_id).or_default().push(item);
    });
    map
}

// Ingredients

pub async fn list_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: &str,
) -> Result<Vec<RecipeIngredient>, sqlx::Error> {
    sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, ri.quantity AS quantity, ri.unit AS unit, ri.note AS note
        FROM recipe_ingredient ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.rowid
    ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_all_recipe_ingredients(
    conn: &mut SqliteConnection,
) -> Result<HashMap<RecipeId, Vec<RecipeIngredient>>, sqlx::Error> {
    let rows: Vec<LinkedIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
            ri.quantity AS quantity, ri.unit AS unit, ri.note AS note
        FROM recipe_ingredient ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        ORDER BY ri.rowid
    ",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(group_by_recipe(rows, |row| (row.recipe_id, row.ingredient)))
}

pub async fn insert_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    ingredients: &[RecipeIngredient],
) -> Result<(), sqlx::Error> {
    for chunk in ingredients.chunks(SQLITE_BIND_LIMIT / 5) {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO recipe_ingredient (recipe_id, ingredient_id, quantity, unit, note) ",
        );

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(recipe_id)
                .push_bind(ingredient.id.as_str())
                .push_bind(ingredient.quantity)
                .push_bind(ingredient.unit.as_str())
                .push_bind(ingredient.note.as_str());
        });

        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

pub async fn replace_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    ingredients: &[RecipeIngredient],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_ingredient WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    insert_recipe_ingredients(conn, recipe_id, ingredients).await
}

// Instructions

pub async fn list_recipe_instructions(
    conn: &mut SqliteConnection,
    recipe_id: &str,
) -> Result<Vec<Instruction>, sqlx::Error> {
    sqlx::query_as(
        "
        SELECT id, step_number, description
        FROM instructions
        WHERE recipe_id = $1
        ORDER BY step_number ASC
    ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_all_recipe_instructions(
    conn: &mut SqliteConnection,
) -> Result<HashMap<RecipeId, Vec<Instruction>>, sqlx::Error> {
    let rows: Vec<LinkedInstruction> = sqlx::query_as(
        "
        SELECT recipe_id, id, step_number, description
        FROM instructions
        ORDER BY recipe_id, step_number ASC
    ",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(group_by_recipe(rows, |row| (row.recipe_id, row.instruction)))
}

pub async fn insert_recipe_instructions(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    instructions: &[Instruction],
) -> Result<(), sqlx::Error> {
    for chunk in instructions.chunks(SQLITE_BIND_LIMIT / 4) {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO instructions (id, recipe_id, step_number, description) ",
        );

        query_builder.push_values(chunk, |mut b, instruction| {
            b.push_bind(instruction.id.as_str())
                .push_bind(recipe_id)
                .push_bind(instruction.step_number)
                .push_bind(instruction.description.as_str());
        });

        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

pub async fn replace_recipe_instructions(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    instructions: &[Instruction],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM instructions WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    insert_recipe_instructions(conn, recipe_id, instructions).await
}

// Tags

pub async fn list_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: &str,
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as(
        "
        SELECT t.id AS id, t.name AS name
        FROM recipe_tag rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY rt.rowid
    ",
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_all_recipe_tags(
    conn: &mut SqliteConnection,
) -> Result<HashMap<RecipeId, Vec<Tag>>, sqlx::Error> {
    let rows: Vec<LinkedTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name
        FROM recipe_tag rt
        INNER JOIN tags t ON t.id = rt.tag_id
        ORDER BY rt.rowid
    ",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(group_by_recipe(rows, |row| (row.recipe_id, row.tag)))
}

pub async fn insert_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    tags: &[Tag],
) -> Result<(), sqlx::Error> {
    for chunk in tags.chunks(SQLITE_BIND_LIMIT / 2) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_tag (recipe_id, tag_id) ");

        query_builder.push_values(chunk, |mut b, tag| {
            b.push_bind(recipe_id).push_bind(tag.id.as_str());
        });

        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

pub async fn replace_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    tags: &[Tag],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tag WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    insert_recipe_tags(conn, recipe_id, tags).await
}
