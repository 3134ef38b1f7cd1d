//! Service Container - Centralized service access.
//!
//! Builds every service over one shared `Persistence` unit of work and
//! one cache backend.

use std::sync::Arc;

use super::{
    AuthService, Authenticator, FileManager, FileService, ItemManager, ItemService, UserManager,
    UserService,
};
use crate::config::Config;
use crate::infra::{CacheBackend, Persistence};
use crate::security::JwtKeys;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn items(&self) -> Arc<dyn ItemService>;

    fn files(&self) -> Arc<dyn FileService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    item_service: Arc<dyn ItemService>,
    file_service: Arc<dyn FileService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        item_service: Arc<dyn ItemService>,
        file_service: Arc<dyn FileService>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            item_service,
            file_service,
        }
    }

    /// Create service container from database connection, config and cache
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        config: &Config,
        cache: Arc<dyn CacheBackend>,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));

        Self {
            auth_service: Arc::new(Authenticator::new(uow.clone(), JwtKeys::from_config(config))),
            user_service: Arc::new(UserManager::new(uow.clone(), cache.clone())),
            item_service: Arc::new(ItemManager::new(uow.clone(), cache)),
            file_service: Arc::new(FileManager::new(uow)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn items(&self) -> Arc<dyn ItemService> {
        self.item_service.clone()
    }

    fn files(&self) -> Arc<dyn FileService> {
        self.file_service.clone()
    }
}
