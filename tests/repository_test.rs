//! Repository and unit-of-work tests against in-memory SQLite.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use crud_api_template::config::Config;
use crud_api_template::domain::{ItemChanges, NewFile, NewItem, NewUser, TokenKind, User};
use crud_api_template::errors::AppError;
use crud_api_template::infra::{Database, Persistence, UnitOfWork};
use crud_api_template::security::JwtKeys;
use crud_api_template::services::{AuthService, Authenticator};
use crud_api_template::with_transaction;

async fn persistence() -> Persistence {
    let config = Config::from_lookup(|key| match key {
        "ENVIRONMENT" => Some("testing".to_string()),
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        _ => None,
    })
    .expect("test config");

    let database = Database::connect(&config).await.expect("database");
    Persistence::new(database.get_connection())
}

async fn create_user(uow: &Persistence, email: &str) -> User {
    uow.users()
        .create(NewUser {
            email: email.to_string(),
            username: email.split('@').next().unwrap_or("user").to_string(),
            hashed_password: "not-a-real-hash".to_string(),
            is_active: true,
            is_admin: false,
        })
        .await
        .expect("user")
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let uow = persistence().await;
    create_user(&uow, "dup@example.com").await;

    let result = uow
        .users()
        .create(NewUser {
            email: "dup@example.com".into(),
            username: "other".into(),
            hashed_password: "x".into(),
            is_active: true,
            is_admin: false,
        })
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(uow.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let uow = persistence().await;
    let user = create_user(&uow, "owner@example.com").await;

    uow.items()
        .create(NewItem {
            title: "Owned".into(),
            description: None,
            owner_id: user.id,
        })
        .await
        .unwrap();
    uow.files()
        .create(NewFile {
            name: "a.txt".into(),
            path: "uploads/a.txt".into(),
            file_type: "document".into(),
            mime_type: "text/plain".into(),
            size: None,
            user_id: Some(user.id),
        })
        .await
        .unwrap();
    let by_name = assert_ok!(uow.files().find_by_name("a.txt").await);
    assert_eq!(by_name.map(|f| f.path).as_deref(), Some("uploads/a.txt"));
    uow.tokens()
        .create_user_token(user.id, "t-1".into(), TokenKind::Refresh, Utc::now() + Duration::days(1))
        .await
        .unwrap();

    uow.users().delete(user.id).await.unwrap();

    assert_eq!(uow.items().count().await.unwrap(), 0);
    assert_eq!(uow.files().count_by_user(user.id).await.unwrap(), 0);
    assert!(uow.tokens().find_by_value("t-1", None).await.unwrap().is_none());

    let missing = uow.users().delete(user.id).await;
    assert!(matches!(missing, Err(AppError::NotFound { .. })));
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_item_update_can_clear_description() {
    let uow = persistence().await;
    let user = create_user(&uow, "items@example.com").await;
    let item = uow
        .items()
        .create(NewItem {
            title: "Draft".into(),
            description: Some("temporary".into()),
            owner_id: user.id,
        })
        .await
        .unwrap();

    let untouched = uow
        .items()
        .update(
            item.id,
            ItemChanges {
                title: Some("Final".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(untouched.description.as_deref(), Some("temporary"));

    let cleared = uow
        .items()
        .update(
            item.id,
            ItemChanges {
                title: None,
                description: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.title, "Final");
    assert!(cleared.description.is_none());

    let missing = assert_err!(uow.items().update(Uuid::new_v4(), ItemChanges::default()).await);
    assert!(matches!(missing, AppError::NotFound { .. }));
}

// =============================================================================
// Tokens
// =============================================================================

#[tokio::test]
async fn test_token_lifecycle() {
    let uow = persistence().await;
    let user = create_user(&uow, "tokens@example.com").await;
    let tokens = uow.tokens();
    let now = Utc::now();

    tokens
        .create_user_token(user.id, "live".into(), TokenKind::Refresh, now + Duration::hours(1))
        .await
        .unwrap();
    let stale = tokens
        .create_user_token(user.id, "stale".into(), TokenKind::Refresh, now - Duration::hours(1))
        .await
        .unwrap();
    tokens
        .create_user_token(user.id, "access".into(), TokenKind::Access, now + Duration::hours(1))
        .await
        .unwrap();

    assert!(tokens.is_valid("live", Some(TokenKind::Refresh)).await.unwrap());
    assert!(!tokens.is_valid("live", Some(TokenKind::Access)).await.unwrap());
    assert!(!tokens.is_valid("stale", None).await.unwrap());
    assert_eq!(
        tokens
            .list_user_tokens(user.id, Some(TokenKind::Refresh))
            .await
            .unwrap()
            .len(),
        2
    );

    let extended = assert_ok!(tokens.extend_expiry(stale.id, 2).await);
    assert!(extended.expires_at > Utc::now() + Duration::minutes(110));

    assert_eq!(tokens.clean_expired().await.unwrap(), 0);
    assert!(tokens.revoke("live", Some(TokenKind::Refresh)).await.unwrap());
    assert!(!tokens.revoke("live", Some(TokenKind::Refresh)).await.unwrap());
    assert_eq!(tokens.revoke_all_for_user(user.id, None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_clean_expired_removes_only_expired() {
    let uow = persistence().await;
    let user = create_user(&uow, "purge@example.com").await;
    let tokens = uow.tokens();

    tokens
        .create_user_token(user.id, "old".into(), TokenKind::Refresh, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    tokens
        .create_user_token(user.id, "new".into(), TokenKind::Refresh, Utc::now() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(tokens.clean_expired().await.unwrap(), 1);
    assert!(tokens.find_by_value("new", None).await.unwrap().is_some());
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_transaction_commits_rotation() {
    let uow = persistence().await;
    let user = create_user(&uow, "tx@example.com").await;
    let user_id = user.id;
    uow.tokens()
        .create_user_token(user_id, "first".into(), TokenKind::Refresh, Utc::now() + Duration::days(1))
        .await
        .unwrap();

    let rotated: Result<bool, AppError> = with_transaction!(uow, |ctx| {
        let tokens = ctx.tokens();
        let revoked = tokens.revoke("first", Some(TokenKind::Refresh)).await?;
        tokens
            .create(user_id, "second".into(), TokenKind::Refresh, Utc::now() + Duration::days(1))
            .await?;
        Ok(revoked)
    });

    assert!(rotated.unwrap());
    assert!(uow.tokens().find_by_value("first", None).await.unwrap().is_none());
    assert!(uow.tokens().find_by_value("second", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_transaction_rolls_back_on_error() {
    let uow = persistence().await;
    let user = create_user(&uow, "rollback@example.com").await;
    let user_id = user.id;
    uow.tokens()
        .create_user_token(user_id, "keep".into(), TokenKind::Refresh, Utc::now() + Duration::days(1))
        .await
        .unwrap();

    let result: Result<(), AppError> = with_transaction!(uow, |ctx| {
        ctx.tokens().revoke("keep", Some(TokenKind::Refresh)).await?;
        Err(AppError::InvalidToken)
    });

    assert!(matches!(result, Err(AppError::InvalidToken)));
    assert!(uow.tokens().find_by_value("keep", None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_refresh_with_expired_stored_token_removes_it() {
    let uow = Arc::new(persistence().await);
    let user = create_user(&uow, "stale@example.com").await;
    let keys = JwtKeys::new(
        b"repository-test-secret-key-0123456789",
        Algorithm::HS256,
        Duration::minutes(30),
        Duration::days(7),
    );

    // The JWT itself is still live; only the stored row has lapsed
    let refresh = keys.create_refresh_token(&user.id.to_string(), None).unwrap();
    uow.tokens()
        .create_user_token(user.id, refresh.clone(), TokenKind::Refresh, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    let auth = Authenticator::new(uow.clone(), keys);
    let result = auth.refresh(&refresh).await;

    assert!(matches!(result, Err(AppError::TokenExpired)));
    assert!(uow.tokens().find_by_value(&refresh, None).await.unwrap().is_none());

    let again = auth.refresh(&refresh).await;
    assert!(matches!(again, Err(AppError::InvalidToken)));
}
