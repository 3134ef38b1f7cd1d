//! HTTP request handlers.

pub mod auth_handler;
pub mod file_handler;
pub mod item_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use file_handler::file_routes;
pub use item_handler::item_routes;
pub use user_handler::user_routes;
