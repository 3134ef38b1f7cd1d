//! File metadata service.
//!
//! Only metadata is stored. Names, sizes and declared MIME types are
//! checked against the allow-lists before anything is written.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{ALLOWED_FILE_EXTENSIONS, ALLOWED_MIME_TYPES, MAX_FILE_SIZE_BYTES};
use crate::domain::{File, FileChanges, NewFile};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use crate::validators::{validate_file_extension, validate_file_size, validate_mime_type};

#[async_trait]
pub trait FileService: Send + Sync {
    /// Validate and store metadata. Conflict when the path is already registered.
    async fn register_file(&self, new_file: NewFile) -> AppResult<File>;

    async fn get_file(&self, id: Uuid) -> AppResult<File>;

    async fn list_user_files(&self, user_id: Uuid, params: PaginationParams) -> AppResult<Paginated<File>>;

    async fn list_by_type(&self, file_type: &str, params: PaginationParams) -> AppResult<Paginated<File>>;

    async fn update_file(&self, id: Uuid, changes: FileChanges) -> AppResult<File>;

    /// Record the final size once an upload completes
    async fn update_size(&self, id: Uuid, size: i64) -> AppResult<File>;

    async fn delete_file(&self, id: Uuid) -> AppResult<()>;
}

fn check_name(name: &str) -> AppResult<()> {
    validate_file_extension(name, ALLOWED_FILE_EXTENSIONS).map_err(AppError::validation)
}

fn check_size(size: i64) -> AppResult<()> {
    if size < 0 {
        return Err(AppError::validation("File size cannot be negative"));
    }
    validate_file_size(size, MAX_FILE_SIZE_BYTES).map_err(AppError::validation)
}

fn check_mime(mime_type: &str) -> AppResult<()> {
    validate_mime_type(mime_type, ALLOWED_MIME_TYPES).map_err(AppError::validation)
}

pub struct FileManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> FileManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn ensure_path_free(&self, path: &str, except: Option<Uuid>) -> AppResult<()> {
        match self.uow.files().find_by_path(path).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(AppError::conflict("File with this path"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> FileService for FileManager<U> {
    async fn register_file(&self, new_file: NewFile) -> AppResult<File> {
        check_name(&new_file.name)?;
        check_mime(&new_file.mime_type)?;
        if let Some(size) = new_file.size {
            check_size(size)?;
        }
        self.ensure_path_free(&new_file.path, None).await?;

        let file = self.uow.files().create(new_file).await?;
        tracing::info!(file_id = %file.id, path = %file.path, "File registered");
        Ok(file)
    }

    async fn get_file(&self, id: Uuid) -> AppResult<File> {
        self.uow
            .files()
            .find_by_id(id)
            .await?
            .ok_or_not_found("File", id)
    }

    async fn list_user_files(&self, user_id: Uuid, params: PaginationParams) -> AppResult<Paginated<File>> {
        let files = self.uow.files();
        let (page, total) = futures::try_join!(
            files.list_by_user(user_id, params.offset(), params.limit()),
            files.count_by_user(user_id)
        )?;

        Ok(Paginated::new(page, &params, total))
    }

    async fn list_by_type(&self, file_type: &str, params: PaginationParams) -> AppResult<Paginated<File>> {
        let files = self.uow.files();
        let (page, total) = futures::try_join!(
            files.list_by_type(file_type, params.offset(), params.limit()),
            files.count_by_type(file_type)
        )?;

        Ok(Paginated::new(page, &params, total))
    }

    async fn update_file(&self, id: Uuid, changes: FileChanges) -> AppResult<File> {
        if let Some(name) = changes.name.as_deref() {
            check_name(name)?;
        }
        if let Some(mime_type) = changes.mime_type.as_deref() {
            check_mime(mime_type)?;
        }
        if let Some(path) = changes.path.as_deref() {
            self.ensure_path_free(path, Some(id)).await?;
        }

        self.uow.files().update(id, changes).await
    }

    async fn update_size(&self, id: Uuid, size: i64) -> AppResult<File> {
        check_size(size)?;
        self.uow.files().update_size(id, size).await
    }

    async fn delete_file(&self, id: Uuid) -> AppResult<()> {
        self.uow.files().delete(id).await?;
        tracing::info!(file_id = %id, "File deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockFileRepository;
    use crate::services::test_support::TestUnitOfWork;
    use chrono::Utc;

    fn new_file(name: &str, mime_type: &str, size: Option<i64>) -> NewFile {
        NewFile {
            name: name.to_string(),
            path: format!("uploads/{}", name),
            file_type: "document".to_string(),
            mime_type: mime_type.to_string(),
            size,
            user_id: Some(Uuid::new_v4()),
        }
    }

    fn stored(new_file: NewFile) -> File {
        File {
            id: Uuid::new_v4(),
            name: new_file.name,
            path: new_file.path,
            file_type: new_file.file_type,
            mime_type: new_file.mime_type,
            size: new_file.size,
            user_id: new_file.user_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn manager(repo: MockFileRepository) -> FileManager<TestUnitOfWork> {
        FileManager::new(Arc::new(TestUnitOfWork::with_files(repo)))
    }

    #[tokio::test]
    async fn test_register_valid_file() {
        let mut repo = MockFileRepository::new();
        repo.expect_find_by_path().returning(|_| Ok(None));
        repo.expect_create().returning(|f| Ok(stored(f)));

        let file = manager(repo)
            .register_file(new_file("Report.PDF", "application/pdf", Some(2048)))
            .await
            .unwrap();

        assert_eq!(file.name, "Report.PDF");
        assert_eq!(file.size, Some(2048));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_metadata() {
        let mut repo = MockFileRepository::new();
        repo.expect_create().never();
        let service = manager(repo);

        let bad_extension = service
            .register_file(new_file("script.exe", "application/pdf", None))
            .await;
        let bad_mime = service
            .register_file(new_file("page.txt", "text/html", None))
            .await;
        let too_big = service
            .register_file(new_file("big.zip", "application/zip", Some(MAX_FILE_SIZE_BYTES + 1)))
            .await;

        assert!(matches!(bad_extension, Err(AppError::Validation(_))));
        assert!(matches!(bad_mime, Err(AppError::Validation(_))));
        assert!(matches!(too_big, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_path_conflicts() {
        let mut repo = MockFileRepository::new();
        repo.expect_find_by_path()
            .returning(|_| Ok(Some(stored(new_file("a.txt", "text/plain", None)))));
        repo.expect_create().never();

        let result = manager(repo)
            .register_file(new_file("a.txt", "text/plain", None))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_size_validates() {
        let mut repo = MockFileRepository::new();
        repo.expect_update_size().times(1).returning(|_, size| {
            let mut file = stored(new_file("a.txt", "text/plain", None));
            file.size = Some(size);
            Ok(file)
        });
        let service = manager(repo);

        assert!(service.update_size(Uuid::new_v4(), -1).await.is_err());
        assert_eq!(
            service.update_size(Uuid::new_v4(), 10).await.unwrap().size,
            Some(10)
        );
    }
}
