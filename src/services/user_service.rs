//! User service - Handles user-related business logic.
//!
//! Lookups by id are read through the cache under `user:{id}`; every
//! mutation clears `user:{id}*`. Only the public projection is cached,
//! never the password hash.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::CACHE_PREFIX_USER;
use crate::domain::{NewUser, Password, User, UserChanges, UserResponse};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::cache::{cache_key, cached, invalidating};
use crate::infra::{CacheBackend, UnitOfWork, UserRepository};
use crate::types::{Paginated, PaginationParams};

/// Account to create. The password is plain text and hashed by the service.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl NewAccount {
    /// Active, non-admin account, the shape produced by self-registration.
    pub fn regular(email: String, username: String, password: String) -> Self {
        Self {
            email,
            username,
            password,
            is_active: true,
            is_admin: false,
        }
    }
}

/// Partial user update with a plain-text password.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UserUpdate {
    /// Whether the update touches privilege flags.
    pub fn touches_privileges(&self) -> bool {
        self.is_active.is_some() || self.is_admin.is_some()
    }
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Public view of a user, read through the cache
    async fn get_user(&self, id: Uuid) -> AppResult<UserResponse>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<User>;

    async fn list_users(&self, params: PaginationParams) -> AppResult<Paginated<User>>;

    /// Conflict when the email is already registered
    async fn create_user(&self, account: NewAccount) -> AppResult<User>;

    /// Check credentials. Inactive accounts are rejected after the password check.
    async fn authenticate_user(&self, email: &str, password: &str) -> AppResult<User>;

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<User>;

    async fn delete_user(&self, id: Uuid) -> AppResult<()>;
}

/// Verify `password` for the account registered under `email`.
///
/// Unknown emails still pay for one hash verification so response timing
/// does not reveal which addresses exist.
pub(crate) async fn authenticate(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> AppResult<User> {
    let user = match users.find_by_email(email).await? {
        Some(user) => user,
        None => {
            Password::verify_dummy(password);
            return Err(AppError::InvalidCredentials);
        }
    };

    if !Password::from_hash(user.hashed_password.as_str()).verify(password) {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::AccountDisabled);
    }

    Ok(user)
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn CacheBackend>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { uow, cache }
    }

    fn invalidation_pattern(id: Uuid) -> String {
        format!("{}*", cache_key(CACHE_PREFIX_USER, &[&id.to_string()], &[]))
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> AppResult<()> {
        match self.uow.users().find_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(AppError::conflict("User with this email"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn get_user(&self, id: Uuid) -> AppResult<UserResponse> {
        let key = cache_key(CACHE_PREFIX_USER, &[&id.to_string()], &[]);
        let users = self.uow.users();

        cached(self.cache.as_ref(), &key, None, || async move {
            Ok(users.find_by_id(id).await?.map(UserResponse::from))
        })
        .await?
        .ok_or_not_found("User", id)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<User> {
        self.uow
            .users()
            .find_by_email(email)
            .await?
            .ok_or_not_found("User", email)
    }

    async fn list_users(&self, params: PaginationParams) -> AppResult<Paginated<User>> {
        let users = self.uow.users();
        let (items, total) = futures::try_join!(
            users.list(params.offset(), params.limit()),
            users.count()
        )?;

        Ok(Paginated::new(items, &params, total))
    }

    async fn create_user(&self, account: NewAccount) -> AppResult<User> {
        self.ensure_email_free(&account.email, None).await?;

        let hashed_password = Password::hash(&account.password)?.into_string();
        let user = self
            .uow
            .users()
            .create(NewUser {
                email: account.email,
                username: account.username,
                hashed_password,
                is_active: account.is_active,
                is_admin: account.is_admin,
            })
            .await?;

        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    async fn authenticate_user(&self, email: &str, password: &str) -> AppResult<User> {
        authenticate(self.uow.users().as_ref(), email, password).await
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<User> {
        if let Some(email) = update.email.as_deref() {
            self.ensure_email_free(email, Some(id)).await?;
        }

        let hashed_password = match update.password.as_deref() {
            Some(plain) => Some(Password::hash(plain)?.into_string()),
            None => None,
        };

        let changes = UserChanges {
            email: update.email,
            username: update.username,
            hashed_password,
            is_active: update.is_active,
            is_admin: update.is_admin,
        };

        let users = self.uow.users();
        invalidating(
            self.cache.as_ref(),
            &Self::invalidation_pattern(id),
            users.update(id, changes),
        )
        .await
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        let users = self.uow.users();
        invalidating(
            self.cache.as_ref(),
            &Self::invalidation_pattern(id),
            users.delete(id),
        )
        .await?;

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cache::MockCacheBackend;
    use crate::infra::repositories::MockUserRepository;
    use crate::infra::{CacheBackend, MemoryCache};
    use crate::services::test_support::{test_user, TestUnitOfWork};
    use mockall::predicate::eq;

    fn manager(repo: MockUserRepository) -> UserManager<TestUnitOfWork> {
        UserManager::new(
            Arc::new(TestUnitOfWork::with_users(repo)),
            Arc::new(MemoryCache::new(60)),
        )
    }

    #[tokio::test]
    async fn test_get_user_is_cached() {
        let user_id = Uuid::new_v4();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(user_id))
            .times(1)
            .returning(|id| Ok(Some(test_user(id, "a@example.com", "pw-hash"))));

        let service = manager(repo);
        let first = service.get_user(user_id).await.unwrap();
        let second = service.get_user(user_id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cached_user_has_no_password_hash() {
        let user_id = Uuid::new_v4();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_user(id, "a@example.com", "$argon2id$secret-hash"))));

        let cache = Arc::new(MemoryCache::new(60));
        let service = UserManager::new(Arc::new(TestUnitOfWork::with_users(repo)), cache.clone());
        service.get_user(user_id).await.unwrap();

        let key = cache_key(CACHE_PREFIX_USER, &[&user_id.to_string()], &[]);
        let stored = cache.get(&key).await.unwrap().expect("user cached");
        assert!(stored.contains("a@example.com"));
        assert!(!stored.contains("hashed_password"));
        assert!(!stored.contains("secret-hash"));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let result = manager(repo).get_user(Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::NotFound { entity: "User", .. })));
    }

    #[tokio::test]
    async fn test_get_user_survives_cache_outage() {
        let user_id = Uuid::new_v4();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(test_user(id, "a@example.com", "pw-hash"))));

        let mut cache = MockCacheBackend::new();
        cache
            .expect_get()
            .returning(|_| Err(AppError::Cache("connection refused".into())));
        cache
            .expect_set()
            .returning(|_, _, _| Err(AppError::Cache("connection refused".into())));

        let service = UserManager::new(Arc::new(TestUnitOfWork::with_users(repo)), Arc::new(cache));

        assert_eq!(service.get_user(user_id).await.unwrap().id, user_id);
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|email| Ok(Some(test_user(Uuid::new_v4(), email, "pw-hash"))));
        repo.expect_create().never();

        let result = manager(repo)
            .create_user(NewAccount::regular(
                "taken@example.com".into(),
                "taken".into(),
                "Password123!".into(),
            ))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_create()
            .withf(|new_user| {
                new_user.hashed_password.starts_with("$argon2")
                    && new_user.is_active
                    && !new_user.is_admin
            })
            .returning(|new_user| {
                let mut user = test_user(Uuid::new_v4(), &new_user.email, &new_user.hashed_password);
                user.username = new_user.username;
                Ok(user)
            });

        let user = manager(repo)
            .create_user(NewAccount::regular(
                "new@example.com".into(),
                "newbie".into(),
                "Password123!".into(),
            ))
            .await
            .unwrap();

        assert_eq!(user.username, "newbie");
        assert!(Password::from_hash(user.hashed_password).verify("Password123!"));
    }

    #[tokio::test]
    async fn test_authenticate_user() {
        let hash = Password::hash("Password123!").unwrap().into_string();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(move |email| {
            Ok(match email {
                "known@example.com" => Some(test_user(Uuid::new_v4(), email, &hash)),
                "disabled@example.com" => {
                    let mut user = test_user(Uuid::new_v4(), email, &hash);
                    user.is_active = false;
                    Some(user)
                }
                _ => None,
            })
        });

        let service = manager(repo);

        assert!(service
            .authenticate_user("known@example.com", "Password123!")
            .await
            .is_ok());
        assert!(matches!(
            service.authenticate_user("known@example.com", "wrong-password").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate_user("nobody@example.com", "Password123!").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate_user("disabled@example.com", "Password123!").await,
            Err(AppError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_update_user_rehashes_password_and_checks_email() {
        let user_id = Uuid::new_v4();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(move |email| Ok(Some(test_user(user_id, email, "old-hash"))));
        repo.expect_update()
            .withf(move |id, changes| {
                *id == user_id
                    && changes.hashed_password.as_deref().map_or(false, |h| h.starts_with("$argon2"))
                    && changes.email.as_deref() == Some("same@example.com")
            })
            .returning(|id, changes| {
                let mut user = test_user(id, "same@example.com", "x");
                user.hashed_password = changes.hashed_password.unwrap_or_default();
                Ok(user)
            });

        let update = UserUpdate {
            email: Some("same@example.com".into()),
            password: Some("NewPassword1!".into()),
            ..UserUpdate::default()
        };
        let user = manager(repo).update_user(user_id, update).await.unwrap();

        assert!(Password::from_hash(user.hashed_password).verify("NewPassword1!"));
    }

    #[tokio::test]
    async fn test_update_user_email_taken_by_someone_else() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|email| Ok(Some(test_user(Uuid::new_v4(), email, "hash"))));
        repo.expect_update().never();

        let update = UserUpdate {
            email: Some("other@example.com".into()),
            ..UserUpdate::default()
        };
        let result = manager(repo).update_user(Uuid::new_v4(), update).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_user_clears_cached_entry() {
        let user_id = Uuid::new_v4();

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .times(2)
            .returning(|id| Ok(Some(test_user(id, "a@example.com", "hash"))));
        repo.expect_delete().with(eq(user_id)).returning(|_| Ok(()));

        let service = manager(repo);
        service.get_user(user_id).await.unwrap();
        service.delete_user(user_id).await.unwrap();
        // Cache was cleared, so this goes back to the repository
        service.get_user(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_users_paginates() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .with(eq(20), eq(10))
            .returning(|_, _| Ok(vec![test_user(Uuid::new_v4(), "a@example.com", "h")]));
        repo.expect_count().returning(|| Ok(21));

        let page = manager(repo)
            .list_users(PaginationParams::new(3, 10))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page_info.total_pages, 3);
        assert!(!page.page_info.has_next);
    }
}
