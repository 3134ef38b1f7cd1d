//! Item repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use super::entities::item::{self, ActiveModel, Entity as ItemEntity};
use crate::domain::{Item, ItemChanges, NewItem};
use crate::errors::{AppError, AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Item>>;

    async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<Item>>;

    async fn list_by_owner(&self, owner_id: Uuid, offset: u64, limit: u64) -> AppResult<Vec<Item>>;

    async fn count(&self) -> AppResult<u64>;

    async fn count_by_owner(&self, owner_id: Uuid) -> AppResult<u64>;

    async fn create(&self, new_item: NewItem) -> AppResult<Item>;

    async fn update(&self, id: Uuid, changes: ItemChanges) -> AppResult<Item>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct ItemStore {
    db: DatabaseConnection,
}

impl ItemStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn ordered(query: Select<ItemEntity>) -> Select<ItemEntity> {
        query
            .order_by_asc(item::Column::CreatedAt)
            .order_by_asc(item::Column::Id)
    }
}

#[async_trait]
impl ItemRepository for ItemStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Item>> {
        let result = ItemEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Item::from))
    }

    async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<Item>> {
        let models = Self::ordered(ItemEntity::find())
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Item::from).collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid, offset: u64, limit: u64) -> AppResult<Vec<Item>> {
        let models = Self::ordered(ItemEntity::find().filter(item::Column::OwnerId.eq(owner_id)))
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Item::from).collect())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(ItemEntity::find().count(&self.db).await?)
    }

    async fn count_by_owner(&self, owner_id: Uuid) -> AppResult<u64> {
        Ok(ItemEntity::find()
            .filter(item::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await?)
    }

    async fn create(&self, new_item: NewItem) -> AppResult<Item> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new_item.title),
            description: Set(new_item.description),
            owner_id: Set(new_item.owner_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await?;
        Ok(Item::from(model))
    }

    async fn update(&self, id: Uuid, changes: ItemChanges) -> AppResult<Item> {
        let item = ItemEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Item", id)?;

        let mut active: ActiveModel = item.into();

        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Ok(Item::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = ItemEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("Item", id));
        }

        Ok(())
    }
}
