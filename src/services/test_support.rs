//! Unit of work over mocked repositories for service tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::User;
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::{
    MockFileRepository, MockItemRepository, MockTokenRepository, MockUserRepository,
};
use crate::infra::{
    FileRepository, ItemRepository, TokenRepository, TransactionContext, TxFuture, UnitOfWork,
    UserRepository,
};

pub(crate) fn test_user(id: Uuid, email: &str, hashed_password: &str) -> User {
    User {
        id,
        email: email.to_string(),
        username: "tester".to_string(),
        hashed_password: hashed_password.to_string(),
        is_active: true,
        is_admin: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Repositories default to mocks with no expectations, so any
/// unexpected call fails the test.
pub(crate) struct TestUnitOfWork {
    pub users: Arc<MockUserRepository>,
    pub items: Arc<MockItemRepository>,
    pub files: Arc<MockFileRepository>,
    pub tokens: Arc<MockTokenRepository>,
}

impl Default for TestUnitOfWork {
    fn default() -> Self {
        Self {
            users: Arc::new(MockUserRepository::new()),
            items: Arc::new(MockItemRepository::new()),
            files: Arc::new(MockFileRepository::new()),
            tokens: Arc::new(MockTokenRepository::new()),
        }
    }
}

impl TestUnitOfWork {
    pub fn with_users(users: MockUserRepository) -> Self {
        Self {
            users: Arc::new(users),
            ..Self::default()
        }
    }

    pub fn with_items(items: MockItemRepository) -> Self {
        Self {
            items: Arc::new(items),
            ..Self::default()
        }
    }

    pub fn with_files(files: MockFileRepository) -> Self {
        Self {
            files: Arc::new(files),
            ..Self::default()
        }
    }
}

#[async_trait]
impl UnitOfWork for TestUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn items(&self) -> Arc<dyn ItemRepository> {
        self.items.clone()
    }

    fn files(&self) -> Arc<dyn FileRepository> {
        self.files.clone()
    }

    fn tokens(&self) -> Arc<dyn TokenRepository> {
        self.tokens.clone()
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // Needs a real connection; covered by the sqlite integration tests
        Err(AppError::internal("Transactions not supported in test mock"))
    }
}
