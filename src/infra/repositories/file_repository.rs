//! File metadata repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::file::{self, ActiveModel, Entity as FileEntity};
use crate::domain::{File, FileChanges, NewFile};
use crate::errors::{AppError, AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>>;

    async fn find_by_name(&self, name: &str) -> AppResult<Option<File>>;

    async fn find_by_path(&self, path: &str) -> AppResult<Option<File>>;

    async fn list_by_user(&self, user_id: Uuid, offset: u64, limit: u64) -> AppResult<Vec<File>>;

    async fn count_by_user(&self, user_id: Uuid) -> AppResult<u64>;

    async fn list_by_type(&self, file_type: &str, offset: u64, limit: u64) -> AppResult<Vec<File>>;

    async fn count_by_type(&self, file_type: &str) -> AppResult<u64>;

    async fn create(&self, new_file: NewFile) -> AppResult<File>;

    async fn update(&self, id: Uuid, changes: FileChanges) -> AppResult<File>;

    async fn update_size(&self, id: Uuid, size: i64) -> AppResult<File>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct FileStore {
    db: DatabaseConnection,
}

impl FileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> AppResult<file::Model> {
        FileEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("File", id)
    }
}

#[async_trait]
impl FileRepository for FileStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        let result = FileEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(File::from))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<File>> {
        let result = FileEntity::find()
            .filter(file::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(result.map(File::from))
    }

    async fn find_by_path(&self, path: &str) -> AppResult<Option<File>> {
        let result = FileEntity::find()
            .filter(file::Column::Path.eq(path))
            .one(&self.db)
            .await?;

        Ok(result.map(File::from))
    }

    async fn list_by_user(&self, user_id: Uuid, offset: u64, limit: u64) -> AppResult<Vec<File>> {
        let models = FileEntity::find()
            .filter(file::Column::UserId.eq(user_id))
            .order_by_desc(file::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(File::from).collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(FileEntity::find()
            .filter(file::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    async fn list_by_type(&self, file_type: &str, offset: u64, limit: u64) -> AppResult<Vec<File>> {
        let models = FileEntity::find()
            .filter(file::Column::FileType.eq(file_type))
            .order_by_desc(file::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(File::from).collect())
    }

    async fn count_by_type(&self, file_type: &str) -> AppResult<u64> {
        Ok(FileEntity::find()
            .filter(file::Column::FileType.eq(file_type))
            .count(&self.db)
            .await?)
    }

    async fn create(&self, new_file: NewFile) -> AppResult<File> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_file.name),
            path: Set(new_file.path),
            file_type: Set(new_file.file_type),
            mime_type: Set(new_file.mime_type),
            size: Set(new_file.size),
            user_id: Set(new_file.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Ok(File::from(model))
    }

    async fn update(&self, id: Uuid, changes: FileChanges) -> AppResult<File> {
        let mut active: ActiveModel = self.find_model(id).await?.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(path) = changes.path {
            active.path = Set(path);
        }
        if let Some(file_type) = changes.file_type {
            active.file_type = Set(file_type);
        }
        if let Some(mime_type) = changes.mime_type {
            active.mime_type = Set(mime_type);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Ok(File::from(model))
    }

    async fn update_size(&self, id: Uuid, size: i64) -> AppResult<File> {
        let mut active: ActiveModel = self.find_model(id).await?.into();
        active.size = Set(Some(size));
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Ok(File::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = FileEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("File", id));
        }

        Ok(())
    }
}
