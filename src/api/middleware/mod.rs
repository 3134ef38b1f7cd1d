//! API middleware.

mod auth;
mod logging;
mod rate_limit;

pub use auth::{auth_middleware, require_access, require_admin, CurrentUser};
pub use logging::request_logging_middleware;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
