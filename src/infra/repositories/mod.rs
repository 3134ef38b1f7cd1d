//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod entities;
mod file_repository;
mod item_repository;
pub(crate) mod token_repository;
mod user_repository;

pub use file_repository::{FileRepository, FileStore};
pub use item_repository::{ItemRepository, ItemStore};
pub use token_repository::{TokenRepository, TokenStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use file_repository::MockFileRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use item_repository::MockItemRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use token_repository::MockTokenRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;

use sea_orm::{DbErr, SqlErr};

use crate::errors::AppError;

/// Turn a unique-constraint failure into `Conflict`, anything else stays a database error.
pub(crate) fn unique_violation(err: DbErr, entity: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(entity),
        _ => AppError::Database(err),
    }
}
