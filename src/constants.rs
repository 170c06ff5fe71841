pub const API_VERSION: &str = "v1";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://recipes.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const IN_MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Upper bound on accepted JSON request bodies.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub const CORS_ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "OPTIONS"];
pub const CORS_ALLOWED_HEADERS: &[&str] = &["Accept", "Authorization", "Content-Type", "X-CSRF-Token"];
pub const CORS_MAX_AGE_SECONDS: u32 = 300;

/// Default `SQLITE_MAX_VARIABLE_NUMBER`; bulk inserts are chunked to stay under it.
pub const SQLITE_BIND_LIMIT: usize = 32766;

/// `log` target for per-request access lines.
pub const ACCESS_LOG_TARGET: &str = "recipe_api::access";
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Longer client-supplied request ids are replaced with a generated one.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Requests allowed per client IP in each window. Zero disables limiting.
pub const DEFAULT_RATE_LIMIT: u32 = 100;
pub const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
/// Tracked clients above which expired windows are swept.
pub const RATE_LIMIT_SWEEP_THRESHOLD: usize = 4096;
