//! Authentication service - Handles user authentication and token lifecycle.
//!
//! Access tokens are stateless JWTs. Refresh tokens are JWTs too, but each
//! one is also persisted so it can be revoked and rotated exactly once.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user_service::{authenticate, NewAccount};
use crate::config::TOKEN_TYPE_BEARER;
use crate::domain::{NewUser, Password, TokenKind, User};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::security::{expiry_after, Claims, JwtKeys};
use crate::with_transaction;

/// Token pair returned after login or refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Always "bearer"
    #[schema(example = "bearer")]
    pub token_type: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    #[schema(example = 1800)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Self-registration: active, non-admin account
    async fn register(&self, email: String, username: String, password: String) -> AppResult<User>;

    async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair>;

    /// Exchange a refresh token for a new pair. The old refresh token is revoked.
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair>;

    /// Revoke one refresh token. Unknown tokens are ignored.
    async fn logout(&self, refresh_token: &str) -> AppResult<()>;

    /// Revoke every stored token of a user
    async fn logout_all(&self, user_id: Uuid) -> AppResult<u64>;

    fn verify_access_token(&self, token: &str) -> AppResult<Claims>;

    /// Resolve the user behind an access token
    async fn current_user(&self, token: &str) -> AppResult<User>;

    async fn purge_expired_tokens(&self) -> AppResult<u64>;
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    keys: JwtKeys,
}

/// Outcome of the refresh transaction. An expired token is removed and the
/// removal committed before the caller sees `TokenExpired`.
enum Rotation {
    Rotated(Minted),
    Expired,
}

/// Freshly minted tokens, not yet persisted.
struct Minted {
    access_token: String,
    refresh_token: String,
    refresh_expires_at: chrono::DateTime<Utc>,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, keys: JwtKeys) -> Self {
        Self { uow, keys }
    }

    fn mint(&self, user: &User) -> AppResult<Minted> {
        let sub = user.id.to_string();

        Ok(Minted {
            access_token: self.keys.create_access_token_for(&sub, user.is_admin)?,
            refresh_token: self.keys.create_refresh_token(&sub, None)?,
            refresh_expires_at: expiry_after(Utc::now(), self.keys.refresh_ttl())?,
        })
    }

    fn pair(&self, minted: Minted) -> TokenPair {
        TokenPair {
            access_token: minted.access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            refresh_token: minted.refresh_token,
            expires_in: self.keys.access_ttl().num_seconds(),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register(&self, email: String, username: String, password: String) -> AppResult<User> {
        let users = self.uow.users();
        if users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email"));
        }

        let account = NewAccount::regular(email, username, password);
        let hashed_password = Password::hash(&account.password)?.into_string();
        let user = users
            .create(NewUser {
                email: account.email,
                username: account.username,
                hashed_password,
                is_active: account.is_active,
                is_admin: account.is_admin,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = match authenticate(self.uow.users().as_ref(), email, password).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Login rejected");
                return Err(e);
            }
        };

        let minted = self.mint(&user)?;
        self.uow
            .tokens()
            .create_user_token(
                user.id,
                minted.refresh_token.clone(),
                TokenKind::Refresh,
                minted.refresh_expires_at,
            )
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(self.pair(minted))
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.keys.decode_kind(refresh_token, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;
        let presented = refresh_token.to_string();
        let keys = self.keys.clone();

        let rotation = with_transaction!(self.uow, |ctx| {
            let tokens = ctx.tokens();
            let stored = tokens
                .find_by_value(&presented, Some(TokenKind::Refresh))
                .await?
                .ok_or(AppError::InvalidToken)?;

            if stored.user_id != user_id {
                return Err(AppError::InvalidToken);
            }
            if stored.is_expired(Utc::now()) {
                tokens.revoke(&presented, Some(TokenKind::Refresh)).await?;
                return Ok(Rotation::Expired);
            }

            let user = ctx
                .users()
                .find_by_id(user_id)
                .await?
                .ok_or(AppError::InvalidToken)?;
            if !user.is_active {
                return Err(AppError::AccountDisabled);
            }

            let sub = user.id.to_string();
            let minted = Minted {
                access_token: keys.create_access_token_for(&sub, user.is_admin)?,
                refresh_token: keys.create_refresh_token(&sub, None)?,
                refresh_expires_at: expiry_after(Utc::now(), keys.refresh_ttl())?,
            };

            tokens.revoke(&presented, Some(TokenKind::Refresh)).await?;
            tokens
                .create(
                    user.id,
                    minted.refresh_token.clone(),
                    TokenKind::Refresh,
                    minted.refresh_expires_at,
                )
                .await?;

            Ok(Rotation::Rotated(minted))
        })?;

        let minted = match rotation {
            Rotation::Rotated(minted) => minted,
            Rotation::Expired => {
                tracing::debug!(user_id = %user_id, "Expired refresh token removed");
                return Err(AppError::TokenExpired);
            }
        };

        tracing::debug!(user_id = %user_id, "Refresh token rotated");
        Ok(self.pair(minted))
    }

    async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let revoked = self
            .uow
            .tokens()
            .revoke(refresh_token, Some(TokenKind::Refresh))
            .await?;

        tracing::debug!(revoked, "Logout");
        Ok(())
    }

    async fn logout_all(&self, user_id: Uuid) -> AppResult<u64> {
        let revoked = self.uow.tokens().revoke_all_for_user(user_id, None).await?;
        tracing::info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        self.keys.decode_kind(token, TokenKind::Access)
    }

    async fn current_user(&self, token: &str) -> AppResult<User> {
        let user_id = self.verify_access_token(token)?.user_id()?;

        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        Ok(user)
    }

    async fn purge_expired_tokens(&self) -> AppResult<u64> {
        self.uow.tokens().clean_expired().await
    }
}
