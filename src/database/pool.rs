use std::str::FromStr;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{config::DatabaseConfig, error::StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the shared connection pool and brings the schema up to date.
///
/// Every connection enforces foreign keys, which is what makes deleting a
/// recipe cascade to its association rows. An in-memory database lives only
/// as long as its connection, so that configuration is pinned to a single
/// connection that is never recycled.
pub async fn connect(config: &DatabaseConfig) -> Result<Pool<Sqlite>, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));
    if config.is_in_memory() {
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;
    log::debug!("> Connected to {}", config.url);

    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), StoreError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StoreError::Storage(e.into()))?;
    log::debug!("> Schema is up to date");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> Pool<Sqlite> {
    connect(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory database should open")
}
