//! Application state - Dependency injection container.

use std::sync::Arc;

use crate::api::middleware::RateLimiter;
use crate::config::Config;
use crate::infra::{CacheBackend, Database};
use crate::services::{ServiceContainer, Services};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceContainer>,
    pub cache: Arc<dyn CacheBackend>,
    /// Used by the health probe
    pub database: Arc<Database>,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build every service over `database` and `cache`.
    pub fn from_config(database: Arc<Database>, cache: Arc<dyn CacheBackend>, config: Config) -> Self {
        let services = Arc::new(Services::from_connection(
            database.get_connection(),
            &config,
            cache.clone(),
        ));

        Self::new(services, cache, database, config)
    }

    /// Create application state with manually injected services.
    pub fn new(
        services: Arc<dyn ServiceContainer>,
        cache: Arc<dyn CacheBackend>,
        database: Arc<Database>,
        config: Config,
    ) -> Self {
        Self {
            services,
            cache,
            database,
            rate_limiter: Arc::new(RateLimiter::per_second(config.rate_limit_per_second)),
            config: Arc::new(config),
        }
    }
}
