//! Token repository.
//!
//! The query helpers are generic over `ConnectionTrait` so the pooled
//! store and the transactional repository share one implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::Condition, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::token::{self, ActiveModel, Entity as TokenEntity};
use super::unique_violation;
use crate::domain::{Token, TokenKind};
use crate::errors::{AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a token for a user
    async fn create_user_token(
        &self,
        user_id: Uuid,
        value: String,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Token>;

    /// Look a token up by value, optionally restricted to one kind
    async fn find_by_value(&self, value: &str, kind: Option<TokenKind>) -> AppResult<Option<Token>>;

    /// All tokens of a user, newest first
    async fn list_user_tokens(&self, user_id: Uuid, kind: Option<TokenKind>) -> AppResult<Vec<Token>>;

    /// Delete a single token. Returns whether a row was removed.
    async fn revoke(&self, value: &str, kind: Option<TokenKind>) -> AppResult<bool>;

    /// Delete every token of a user. Returns the number removed.
    async fn revoke_all_for_user(&self, user_id: Uuid, kind: Option<TokenKind>) -> AppResult<u64>;

    /// Delete tokens whose expiry has passed. Returns the number removed.
    async fn clean_expired(&self) -> AppResult<u64>;

    /// Token exists and has not expired
    async fn is_valid(&self, value: &str, kind: Option<TokenKind>) -> AppResult<bool>;

    /// Push the expiry `hours` past the later of now and the current expiry
    async fn extend_expiry(&self, id: Uuid, hours: i64) -> AppResult<Token>;
}

pub struct TokenStore {
    db: DatabaseConnection,
}

impl TokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenRepository for TokenStore {
    async fn create_user_token(
        &self,
        user_id: Uuid,
        value: String,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Token> {
        insert_token(&self.db, user_id, value, kind, expires_at).await
    }

    async fn find_by_value(&self, value: &str, kind: Option<TokenKind>) -> AppResult<Option<Token>> {
        find_token(&self.db, value, kind).await
    }

    async fn list_user_tokens(&self, user_id: Uuid, kind: Option<TokenKind>) -> AppResult<Vec<Token>> {
        let models = TokenEntity::find()
            .filter(by_user(user_id, kind))
            .order_by_desc(token::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(Token::try_from).collect()
    }

    async fn revoke(&self, value: &str, kind: Option<TokenKind>) -> AppResult<bool> {
        delete_token(&self.db, value, kind).await
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, kind: Option<TokenKind>) -> AppResult<u64> {
        let result = TokenEntity::delete_many()
            .filter(by_user(user_id, kind))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn clean_expired(&self) -> AppResult<u64> {
        let result = TokenEntity::delete_many()
            .filter(token::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(removed = result.rows_affected, "Purged expired tokens");
        }
        Ok(result.rows_affected)
    }

    async fn is_valid(&self, value: &str, kind: Option<TokenKind>) -> AppResult<bool> {
        let live = TokenEntity::find()
            .filter(by_value(value, kind))
            .filter(token::Column::ExpiresAt.gt(Utc::now()))
            .count(&self.db)
            .await?;

        Ok(live > 0)
    }

    async fn extend_expiry(&self, id: Uuid, hours: i64) -> AppResult<Token> {
        let model = TokenEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Token", id)?;

        let expires_at = extended_expiry(model.expires_at, Utc::now(), hours);
        let mut active: ActiveModel = model.into();
        active.expires_at = Set(expires_at);

        Token::try_from(active.update(&self.db).await?)
    }
}

/// Later of `now` and `current`, plus `hours`.
pub(crate) fn extended_expiry(current: DateTime<Utc>, now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    current.max(now) + Duration::hours(hours)
}

fn by_value(value: &str, kind: Option<TokenKind>) -> Condition {
    let mut condition = Condition::all().add(token::Column::Token.eq(value));
    if let Some(kind) = kind {
        condition = condition.add(token::Column::TokenType.eq(kind.as_str()));
    }
    condition
}

fn by_user(user_id: Uuid, kind: Option<TokenKind>) -> Condition {
    let mut condition = Condition::all().add(token::Column::UserId.eq(user_id));
    if let Some(kind) = kind {
        condition = condition.add(token::Column::TokenType.eq(kind.as_str()));
    }
    condition
}

pub(crate) async fn insert_token<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    value: String,
    kind: TokenKind,
    expires_at: DateTime<Utc>,
) -> AppResult<Token> {
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        token: Set(value),
        token_type: Set(kind.as_str().to_string()),
        expires_at: Set(expires_at),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
    };

    let model = active_model
        .insert(conn)
        .await
        .map_err(|e| unique_violation(e, "Token"))?;

    Token::try_from(model)
}

pub(crate) async fn find_token<C: ConnectionTrait>(
    conn: &C,
    value: &str,
    kind: Option<TokenKind>,
) -> AppResult<Option<Token>> {
    TokenEntity::find()
        .filter(by_value(value, kind))
        .one(conn)
        .await?
        .map(Token::try_from)
        .transpose()
}

pub(crate) async fn delete_token<C: ConnectionTrait>(
    conn: &C,
    value: &str,
    kind: Option<TokenKind>,
) -> AppResult<bool> {
    let result = TokenEntity::delete_many()
        .filter(by_value(value, kind))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_from_future_expiry() {
        let now = Utc::now();
        let current = now + Duration::hours(2);

        assert_eq!(extended_expiry(current, now, 24), current + Duration::hours(24));
    }

    #[test]
    fn test_extend_from_past_expiry_starts_at_now() {
        let now = Utc::now();
        let current = now - Duration::days(3);

        assert_eq!(extended_expiry(current, now, 24), now + Duration::hours(24));
    }
}
