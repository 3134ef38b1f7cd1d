//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! All services use Unit of Work pattern for centralized repository
//! access and transaction management.

mod auth_service;
pub mod container;
mod file_service;
mod item_service;
mod user_service;

#[cfg(test)]
mod test_support;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, TokenPair};
pub use file_service::{FileManager, FileService};
pub use item_service::{ItemManager, ItemService};
pub use user_service::{NewAccount, UserManager, UserService, UserUpdate};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
