mod database {
    pub mod actions;
    pub mod error;
    pub mod pool;
    pub mod schema;
}
mod api {
    pub mod filters;
    pub mod handlers;
    pub mod rate_limit;
    pub mod reply;
}
mod config;
mod constants;

pub mod util;

pub use actions::*;
pub use api::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use filters::{cors, routes, Stores};
pub use rate_limit::RateLimiter;
