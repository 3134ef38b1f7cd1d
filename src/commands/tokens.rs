//! Tokens command - Refresh token maintenance.

use crate::cli::args::{TokensAction, TokensArgs};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{Database, MemoryCache};
use crate::services::{ServiceContainer, Services};
use std::sync::Arc;

/// Execute the tokens command
pub async fn execute(args: TokensArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    // Nothing here reads through the cache
    let cache = Arc::new(MemoryCache::new(config.cache_ttl_seconds));
    let services = Services::from_connection(db.get_connection(), &config, cache);

    match args.action {
        TokensAction::Purge => {
            let removed = services.auth().purge_expired_tokens().await?;
            tracing::info!(removed, "Expired tokens purged");
            println!("Removed {} expired token(s)", removed);
        }
    }

    Ok(())
}
