use std::time::Duration;

use clap::Parser;

use crate::{
    constants::{
        DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, DEFAULT_RATE_LIMIT,
        IN_MEMORY_DATABASE_URL, RATE_LIMIT_WINDOW_SECONDS,
    },
    rate_limit::RateLimiter,
};

/// Process configuration, read from flags with environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-api", version, about = "Recipe catalog HTTP service")]
pub struct Config {
    /// Port the HTTP server listens on
    #[arg(long, env = "RECIPE_API_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Requests allowed per client IP each minute, 0 to disable
    #[arg(long, env = "RECIPE_API_RATE_LIMIT", default_value_t = DEFAULT_RATE_LIMIT)]
    pub rate_limit: u32,

    #[command(flatten)]
    pub database: DatabaseConfig,
}

impl Config {
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit,
            Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS),
        )
    }
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite connection string, e.g. sqlite://recipes.db or sqlite::memory:
    #[arg(long = "database-url", env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub url: String,

    /// Upper bound on pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}
