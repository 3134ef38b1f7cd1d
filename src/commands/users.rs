//! Users command - Account administration from the shell.

use std::sync::Arc;

use crate::cli::args::{UsersAction, UsersArgs};
use crate::config::{Config, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH};
use crate::domain::Password;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, MemoryCache};
use crate::services::{NewAccount, ServiceContainer, Services};
use crate::validators::{validate_email, validate_string_length};

/// Execute the users command
pub async fn execute(args: UsersArgs, config: Config) -> AppResult<()> {
    match args.action {
        UsersAction::CreateAdmin {
            email,
            username,
            password,
        } => {
            check_admin_input(&email, &username, &password)?;

            let db = Database::connect(&config).await?;
            let cache = Arc::new(MemoryCache::new(config.cache_ttl_seconds));
            let services = Services::from_connection(db.get_connection(), &config, cache);

            let user = services
                .users()
                .create_user(NewAccount {
                    is_admin: true,
                    ..NewAccount::regular(email, username, password)
                })
                .await?;

            tracing::info!(user_id = %user.id, "Admin account created");
            println!("Created admin {} ({})", user.email, user.id);
        }
    }

    Ok(())
}

fn check_admin_input(email: &str, username: &str, password: &str) -> AppResult<()> {
    if !validate_email(email) {
        return Err(AppError::validation("Invalid email format"));
    }
    validate_string_length(username, Some(MIN_USERNAME_LENGTH), Some(MAX_USERNAME_LENGTH))
        .map_err(|e| AppError::validation(format!("username: {}", e)))?;
    Password::check_strength(password)
}
