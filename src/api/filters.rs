use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Sqlite};
use warp::{hyper::body::Bytes, Filter, Rejection, Reply};

use super::{
    handlers,
    rate_limit::{rate_limit, RateLimiter},
};
use crate::{
    constants::{
        API_VERSION, CORS_ALLOWED_HEADERS, CORS_ALLOWED_METHODS, CORS_MAX_AGE_SECONDS,
        MAX_BODY_BYTES, MAX_REQUEST_ID_LEN, REQUEST_ID_HEADER,
    },
    ingredients::{IngredientStore, SqliteIngredientStore},
    recipes::{RecipeStore, SqliteRecipeStore},
    tags::{SqliteTagStore, TagStore},
    util::generate_id,
};

/// The stores handed to the request handlers, constructed once at startup.
#[derive(Clone)]
pub struct Stores {
    pub recipes: Arc<dyn RecipeStore>,
    pub tags: Arc<dyn TagStore>,
    pub ingredients: Arc<dyn IngredientStore>,
}

impl Stores {
    pub fn sqlite(pool: Pool<Sqlite>) -> Self {
        Self {
            recipes: Arc::new(SqliteRecipeStore::new(pool.clone())),
            tags: Arc::new(SqliteTagStore::new(pool.clone())),
            ingredients: Arc::new(SqliteIngredientStore::new(pool)),
        }
    }
}

pub fn with_store<S: ?Sized + Send + Sync + 'static>(
    store: Arc<S>,
) -> impl Filter<Extract = (Arc<S>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn with_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(CORS_ALLOWED_METHODS.iter().copied())
        .allow_headers(CORS_ALLOWED_HEADERS.iter().copied())
        .max_age(CORS_MAX_AGE_SECONDS)
}

/// The client's `x-request-id` when it sent a usable one, otherwise a fresh id.
fn request_id() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>(REQUEST_ID_HEADER).map(|id: Option<String>| match id {
        Some(id) if !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN => id,
        _ => generate_id(),
    })
}

fn tag_request_id<R: Reply>(id: String, reply: R) -> impl Reply {
    warp::reply::with_header(reply, REQUEST_ID_HEADER, id)
}

/// Full route tree: `/`, `/ping` and the versioned API, rate limited per
/// client IP, with every rejection rendered as a JSON error and every reply
/// carrying a request id.
pub fn routes(
    stores: Stores,
    limiter: RateLimiter,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let root = warp::path::end().and(warp::get()).and_then(handlers::root);
    let ping = warp::path!("ping").and(warp::get()).and_then(handlers::ping);

    let api = warp::path("api").and(warp::path(API_VERSION));

    let tree = root.or(ping).or(api.and(
        recipe_routes(stores.recipes)
            .or(tag_routes(stores.tags))
            .or(ingredient_routes(stores.ingredients)),
    ));

    request_id()
        .and(rate_limit(limiter).and(tree).recover(handlers::recover))
        .map(tag_request_id)
}

fn recipe_routes(
    store: Arc<dyn RecipeStore>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let collection = warp::path("recipes").and(warp::path::end());
    let member = warp::path("recipes")
        .and(warp::path::param::<String>())
        .and(warp::path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(handlers::list_recipes);
    let create = collection
        .and(warp::post())
        .and(with_body())
        .and(with_store(store.clone()))
        .and_then(handlers::create_recipe);
    let get = member
        .clone()
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(handlers::get_recipe);
    let update = member
        .clone()
        .and(warp::put())
        .and(with_body())
        .and(with_store(store.clone()))
        .and_then(handlers::update_recipe);
    let delete = member
        .and(warp::delete())
        .and(with_store(store))
        .and_then(handlers::delete_recipe);

    list.or(create).or(get).or(update).or(delete)
}

fn tag_routes(
    store: Arc<dyn TagStore>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let collection = warp::path("tags").and(warp::path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(handlers::list_tags);
    let create = collection
        .and(warp::post())
        .and(with_body())
        .and(with_store(store))
        .and_then(handlers::create_tag);

    list.or(create)
}

fn ingredient_routes(
    store: Arc<dyn IngredientStore>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let collection = warp::path("ingredients").and(warp::path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(handlers::list_ingredients);
    let create = collection
        .and(warp::post())
        .and(with_body())
        .and(with_store(store))
        .and_then(handlers::create_ingredient);

    list.or(create)
}
