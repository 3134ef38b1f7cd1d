//! CRUD API template
//!
//! Users, items and file metadata behind JWT authentication, with a
//! pluggable cache (memory, file or Redis) and SeaORM persistence.
//!
//! # Architecture Layers
//!
//! - **cli** / **commands**: command-line interface and its implementations
//! - **config**: settings loaded from dotenv files and the environment
//! - **domain**: core entities
//! - **infra**: database, repositories, unit of work, cache backends
//! - **security**: JWT, HMAC signing, symmetric encryption
//! - **services**: use cases over the unit of work
//! - **api**: handlers, middleware and routes
//! - **validators**: reusable input checks
//! - **types**: pagination and response wrappers
//! - **errors**: centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! crud-api serve --port 8000
//! crud-api migrate up
//! crud-api users create-admin --email admin@example.com --username admin --password 'S3cure!pass'
//! crud-api tokens purge
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod security;
pub mod services;
pub mod types;
pub mod validators;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User};
pub use errors::{AppError, AppResult};
