//! Pluggable cache layer.
//!
//! `CacheBackend` stores JSON strings under string keys with an optional
//! TTL. Three backends are provided: Redis for shared deployments, an
//! in-process map, and a directory of files. `cached` and `invalidating`
//! wrap service calls with read-through caching and pattern invalidation.

mod file;
mod memory;
mod redis_cache;

pub use self::file::FileCache;
pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::{CacheKind, Config};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Key/value store with per-entry expiry.
///
/// `ttl` is in seconds. `None` uses the backend's default TTL and
/// `Some(0)` stores the entry without expiry.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Option<u64>) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Remove every key matching a `*`/`?` glob. Returns the number removed.
    async fn clear_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// Cheap liveness probe for health checks
    async fn ping(&self) -> AppResult<()>;

    /// Backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Build the backend selected by `CACHE_BACKEND`.
pub async fn build_cache(config: &Config) -> AppResult<Arc<dyn CacheBackend>> {
    let ttl = config.cache_ttl_seconds;

    let cache: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheKind::Redis => Arc::new(RedisCache::connect(&config.redis_url(), ttl).await?),
        CacheKind::Memory => Arc::new(MemoryCache::new(ttl)),
        CacheKind::File => Arc::new(FileCache::open(&config.cache_dir, ttl).await?),
    };

    tracing::info!(backend = cache.name(), default_ttl = ttl, "Cache initialized");
    Ok(cache)
}

/// Build a cache key: `prefix:arg1:arg2:k1:v1:k2:v2`, keyword pairs sorted by key.
pub fn cache_key(prefix: &str, args: &[&str], kwargs: &[(&str, &str)]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(1 + args.len() + kwargs.len() * 2);
    parts.push(prefix);
    parts.extend_from_slice(args);

    let mut pairs = kwargs.to_vec();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    for (k, v) in pairs {
        parts.push(k);
        parts.push(v);
    }

    parts.join(":")
}

/// Read-through cache around `loader`.
///
/// Only `Some` results are stored. A failing or unreadable cache never
/// fails the call; the loader result is returned instead.
pub async fn cached<T, F, Fut>(
    cache: &dyn CacheBackend,
    key: &str,
    ttl: Option<u64>,
    loader: F,
) -> AppResult<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    match cache.get(key).await {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                return Ok(Some(value));
            }
            Err(e) => tracing::warn!(key, error = %e, "Discarding undecodable cache entry"),
        },
        Ok(None) => tracing::debug!(key, "Cache miss"),
        Err(e) => tracing::warn!(key, error = %e, "Cache read failed"),
    }

    let value = loader().await?;

    if let Some(ref v) = value {
        match serde_json::to_string(v) {
            Ok(json) => {
                if let Err(e) = cache.set(key, json, ttl).await {
                    tracing::warn!(key, error = %e, "Cache write failed");
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "Value not cacheable"),
        }
    }

    Ok(value)
}

/// Run `op` and, when it succeeds, clear every key matching `pattern`.
pub async fn invalidating<T, Fut>(cache: &dyn CacheBackend, pattern: &str, op: Fut) -> AppResult<T>
where
    Fut: Future<Output = AppResult<T>>,
{
    let result = op.await?;

    match cache.clear_pattern(pattern).await {
        Ok(removed) => tracing::debug!(pattern, removed, "Cache invalidated"),
        Err(e) => tracing::warn!(pattern, error = %e, "Cache invalidation failed"),
    }

    Ok(result)
}

/// Anchored regex equivalent of a `*`/`?` glob.
pub(crate) fn glob_to_regex(pattern: &str) -> AppResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| AppError::bad_request(format!("Invalid cache pattern: {}", e)))
}
