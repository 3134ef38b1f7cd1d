//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and wraps multi-step writes
//! (refresh token rotation, for one) in a single database transaction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction,
    IsolationLevel, TransactionTrait,
};
use uuid::Uuid;

use super::repositories::entities::user::Entity as UserEntity;
use super::repositories::token_repository::{delete_token, find_token, insert_token};
use super::repositories::{
    FileRepository, FileStore, ItemRepository, ItemStore, TokenRepository, TokenStore,
    UserRepository, UserStore,
};
use crate::domain::{Token, TokenKind, User};
use crate::errors::AppResult;

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because `transaction` is generic; tests provide
/// their own implementation around mocked repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn items(&self) -> Arc<dyn ItemRepository>;

    fn files(&self) -> Arc<dyn FileRepository>;

    fn tokens(&self) -> Arc<dyn TokenRepository>;

    /// Run `f` inside a transaction. Committed on `Ok`, rolled back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access bound to one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository { txn: self.txn }
    }

    pub fn tokens(&self) -> TxTokenRepository<'_> {
        TxTokenRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    item_repo: Arc<ItemStore>,
    file_repo: Arc<FileStore>,
    token_repo: Arc<TokenStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone())),
            item_repo: Arc::new(ItemStore::new(db.clone())),
            file_repo: Arc::new(FileStore::new(db.clone())),
            token_repo: Arc::new(TokenStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn items(&self) -> Arc<dyn ItemRepository> {
        self.item_repo.clone()
    }

    fn files(&self) -> Arc<dyn FileRepository> {
        self.file_repo.clone()
    }

    fn tokens(&self) -> Arc<dyn TokenRepository> {
        self.token_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // SQLite transactions are always serializable and take no options
        let (isolation, access) = match self.db.get_database_backend() {
            DatabaseBackend::Sqlite => (None, None),
            _ => (Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite)),
        };
        let txn = self.db.begin_with_config(isolation, access).await?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-bound user lookups.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxUserRepository<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        use sea_orm::EntityTrait;

        let result = UserEntity::find_by_id(id).one(self.txn).await?;
        Ok(result.map(User::from))
    }
}

/// Transaction-bound token operations used by refresh rotation.
pub struct TxTokenRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxTokenRepository<'_> {
    pub async fn find_by_value(&self, value: &str, kind: Option<TokenKind>) -> AppResult<Option<Token>> {
        find_token(self.txn, value, kind).await
    }

    pub async fn revoke(&self, value: &str, kind: Option<TokenKind>) -> AppResult<bool> {
        delete_token(self.txn, value, kind).await
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        value: String,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Token> {
        insert_token(self.txn, user_id, value, kind, expires_at).await
    }
}

/// Run a block inside `UnitOfWork::transaction` without spelling out the boxing.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
