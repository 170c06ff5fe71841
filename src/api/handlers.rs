use std::{convert::Infallible, sync::Arc};

use serde::Deserialize;
use serde_json::json;
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge},
    reply::Response,
    Rejection,
};

use super::{rate_limit::RateLimited, reply};
use crate::{
    constants::API_VERSION,
    error::StoreError,
    ingredients::IngredientStore,
    recipes::RecipeStore,
    schema::{Ingredient, Instruction, Recipe, RecipeIngredient, Tag},
    tags::TagStore,
    util::{generate_id, make_slug, read_id_param},
};

/// Body of `PUT /recipes/{id}`. Absent fields keep their stored value;
/// a present collection replaces the stored one entirely.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecipeUpdateRequest {
    pub name: Option<String>,
    pub servings: Option<i64>,
    pub prep_time_seconds: Option<i64>,
    pub cook_time_seconds: Option<i64>,
    pub ingredients: Option<Vec<RecipeIngredient>>,
    pub instructions: Option<Vec<Instruction>>,
    pub tags: Option<Vec<Tag>>,
}

impl RecipeUpdateRequest {
    pub fn apply(self, recipe: &mut Recipe) {
        if let Some(name) = self.name {
            recipe.name = name;
        }
        if let Some(servings) = self.servings {
            recipe.servings = servings;
        }
        if let Some(prep_time_seconds) = self.prep_time_seconds {
            recipe.prep_time_seconds = prep_time_seconds;
        }
        if let Some(cook_time_seconds) = self.cook_time_seconds {
            recipe.cook_time_seconds = cook_time_seconds;
        }
        if let Some(ingredients) = self.ingredients {
            recipe.ingredients = ingredients;
        }
        if let Some(instructions) = self.instructions {
            recipe.instructions = instructions;
        }
        if let Some(tags) = self.tags {
            recipe.tags = tags;
        }
    }
}

/// Steps are owned by their recipe, so their ids are always minted here.
fn assign_step_ids(instructions: &mut [Instruction]) {
    for step in instructions {
        step.id = generate_id();
    }
}

fn invalid_body(op: &str, e: serde_json::Error) -> Response {
    log::error!("{op}: {e}");
    reply::error(StatusCode::BAD_REQUEST, "invalid request body")
}

fn invalid_id(op: &str, param: &str) -> Response {
    log::error!("{op}: invalid id parameter {param:?}");
    reply::error(StatusCode::BAD_REQUEST, "invalid recipe id")
}

fn recipe_write_failed(op: &str, e: StoreError, message: &str) -> Response {
    log::error!("{op}: {e}");
    match e {
        StoreError::NotFound => reply::error(StatusCode::NOT_FOUND, "recipe not found"),
        e if e.is_foreign_key_violation() => reply::error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "recipe references an unknown ingredient or tag",
        ),
        e if e.is_unique_violation() => reply::error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "recipe lists the same tag more than once",
        ),
        _ => reply::error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

/// Renders rejections that no route turned into a reply with the same
/// `{"error": ...}` envelope the handlers use.
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else if rejection.find::<RateLimited>().is_some() {
        (StatusCode::TOO_MANY_REQUESTS, "too many requests")
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else if rejection.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "content length required")
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        log::error!("unhandled rejection: {rejection:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    };

    Ok(reply::error(status, message))
}

pub async fn root() -> Result<Response, Infallible> {
    Ok(reply::json(
        StatusCode::OK,
        &json!({ "status": "ok", "version": API_VERSION }),
    ))
}

pub async fn ping() -> Result<Response, Infallible> {
    Ok(reply::json(StatusCode::OK, &json!({ "message": "pong" })))
}

// Recipes

pub async fn list_recipes(store: Arc<dyn RecipeStore>) -> Result<Response, Infallible> {
    match store.list_recipes().await {
        Ok(recipes) => {
            let total = recipes.len();
            Ok(reply::json(
                StatusCode::OK,
                &json!({ "recipes": recipes, "total": total }),
            ))
        }
        Err(e) => {
            log::error!("ListRecipes: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch recipes",
            ))
        }
    }
}

pub async fn create_recipe(
    body: Bytes,
    store: Arc<dyn RecipeStore>,
) -> Result<Response, Infallible> {
    let mut recipe: Recipe = match serde_json::from_slice(&body) {
        Ok(recipe) => recipe,
        Err(e) => return Ok(invalid_body("CreateRecipe", e)),
    };

    if recipe.name.trim().is_empty() {
        return Ok(reply::error(
            StatusCode::BAD_REQUEST,
            "name cannot be blank",
        ));
    }

    recipe.id = generate_id();
    recipe.slug = make_slug(&recipe.name);
    assign_step_ids(&mut recipe.instructions);

    match store.create_recipe(recipe).await {
        Ok(created) => Ok(reply::json(
            StatusCode::CREATED,
            &json!({ "recipe": created }),
        )),
        Err(e) => Ok(recipe_write_failed("CreateRecipe", e, "failed to create recipe")),
    }
}

pub async fn get_recipe(
    id: String,
    store: Arc<dyn RecipeStore>,
) -> Result<Response, Infallible> {
    let id = match read_id_param(&id) {
        Some(id) => id,
        None => return Ok(invalid_id("GetRecipeByID", &id)),
    };

    match store.get_recipe_by_id(id).await {
        Ok(Some(recipe)) => Ok(reply::json(StatusCode::OK, &json!({ "recipe": recipe }))),
        Ok(None) => Ok(reply::error(StatusCode::NOT_FOUND, "recipe not found")),
        Err(e) => {
            log::error!("GetRecipeByID: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch recipe",
            ))
        }
    }
}

pub async fn update_recipe(
    id: String,
    body: Bytes,
    store: Arc<dyn RecipeStore>,
) -> Result<Response, Infallible> {
    let id = match read_id_param(&id) {
        Some(id) => id,
        None => return Ok(invalid_id("UpdateRecipe", &id)),
    };

    let mut recipe = match store.get_recipe_by_id(id).await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => return Ok(reply::error(StatusCode::NOT_FOUND, "recipe not found")),
        Err(e) => {
            log::error!("UpdateRecipe: {e}");
            return Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch recipe",
            ));
        }
    };

    let request: RecipeUpdateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return Ok(invalid_body("UpdateRecipe", e)),
    };
    let replaces_steps = request.instructions.is_some();
    request.apply(&mut recipe);
    if replaces_steps {
        assign_step_ids(&mut recipe.instructions);
    }

    match store.update_recipe(recipe).await {
        Ok(updated) => Ok(reply::json(StatusCode::OK, &json!({ "recipe": updated }))),
        Err(e) => Ok(recipe_write_failed("UpdateRecipe", e, "failed to update recipe")),
    }
}

pub async fn delete_recipe(
    id: String,
    store: Arc<dyn RecipeStore>,
) -> Result<Response, Infallible> {
    let id = match read_id_param(&id) {
        Some(id) => id,
        None => return Ok(invalid_id("DeleteRecipe", &id)),
    };

    match store.delete_recipe(id).await {
        Ok(()) => Ok(reply::no_content()),
        Err(StoreError::NotFound) => Ok(reply::error(StatusCode::NOT_FOUND, "recipe not found")),
        Err(e) => {
            log::error!("DeleteRecipe: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to delete recipe",
            ))
        }
    }
}

// Tags

pub async fn list_tags(store: Arc<dyn TagStore>) -> Result<Response, Infallible> {
    match store.list_tags().await {
        Ok(tags) => {
            let total = tags.len();
            Ok(reply::json(
                StatusCode::OK,
                &json!({ "tags": tags, "total": total }),
            ))
        }
        Err(e) => {
            log::error!("ListTags: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch tags",
            ))
        }
    }
}

pub async fn create_tag(body: Bytes, store: Arc<dyn TagStore>) -> Result<Response, Infallible> {
    let mut tag: Tag = match serde_json::from_slice(&body) {
        Ok(tag) => tag,
        Err(e) => return Ok(invalid_body("CreateTag", e)),
    };

    if tag.name.trim().is_empty() {
        return Ok(reply::error(
            StatusCode::BAD_REQUEST,
            "name cannot be blank",
        ));
    }
    tag.id = generate_id();

    match store.create_tag(tag).await {
        Ok(created) => Ok(reply::json(StatusCode::CREATED, &created)),
        Err(e @ StoreError::Conflict(_)) => {
            log::error!("CreateTag: {e}");
            Ok(reply::error(
                StatusCode::CONFLICT,
                "tag with that name already exists",
            ))
        }
        Err(e) => {
            log::error!("CreateTag: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create tag",
            ))
        }
    }
}

// Ingredients

pub async fn list_ingredients(store: Arc<dyn IngredientStore>) -> Result<Response, Infallible> {
    match store.list_ingredients().await {
        Ok(ingredients) => {
            let total = ingredients.len();
            Ok(reply::json(
                StatusCode::OK,
                &json!({ "ingredients": ingredients, "total": total }),
            ))
        }
        Err(e) => {
            log::error!("ListIngredients: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch ingredients",
            ))
        }
    }
}

pub async fn create_ingredient(
    body: Bytes,
    store: Arc<dyn IngredientStore>,
) -> Result<Response, Infallible> {
    let mut ingredient: Ingredient = match serde_json::from_slice(&body) {
        Ok(ingredient) => ingredient,
        Err(e) => return Ok(invalid_body("CreateIngredient", e)),
    };

    if ingredient.name.trim().is_empty() {
        return Ok(reply::error(
            StatusCode::BAD_REQUEST,
            "name cannot be blank",
        ));
    }
    ingredient.id = generate_id();

    match store.create_ingredient(ingredient).await {
        Ok(created) => Ok(reply::json(StatusCode::CREATED, &created)),
        Err(e @ StoreError::Conflict(_)) => {
            log::error!("CreateIngredient: {e}");
            Ok(reply::error(
                StatusCode::CONFLICT,
                "ingredient with that name already exists",
            ))
        }
        Err(e) => {
            log::error!("CreateIngredient: {e}");
            Ok(reply::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create ingredient",
            ))
        }
    }
}
