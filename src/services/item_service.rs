//! Item service - CRUD over items with read-through caching.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::CACHE_PREFIX_ITEM;
use crate::domain::{Item, ItemChanges, NewItem};
use crate::errors::{AppResult, OptionExt};
use crate::infra::cache::{cache_key, cached, invalidating};
use crate::infra::{CacheBackend, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

#[async_trait]
pub trait ItemService: Send + Sync {
    async fn get_item(&self, id: Uuid) -> AppResult<Item>;

    /// Every item, newest last
    async fn list_items(&self, params: PaginationParams) -> AppResult<Paginated<Item>>;

    async fn list_user_items(&self, owner_id: Uuid, params: PaginationParams) -> AppResult<Paginated<Item>>;

    async fn create_item(&self, new_item: NewItem) -> AppResult<Item>;

    async fn update_item(&self, id: Uuid, changes: ItemChanges) -> AppResult<Item>;

    async fn delete_item(&self, id: Uuid) -> AppResult<()>;
}

pub struct ItemManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn CacheBackend>,
}

impl<U: UnitOfWork> ItemManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { uow, cache }
    }

    fn key(id: Uuid) -> String {
        cache_key(CACHE_PREFIX_ITEM, &[&id.to_string()], &[])
    }
}

#[async_trait]
impl<U: UnitOfWork> ItemService for ItemManager<U> {
    async fn get_item(&self, id: Uuid) -> AppResult<Item> {
        let items = self.uow.items();

        cached(self.cache.as_ref(), &Self::key(id), None, || async move {
            items.find_by_id(id).await
        })
        .await?
        .ok_or_not_found("Item", id)
    }

    async fn list_items(&self, params: PaginationParams) -> AppResult<Paginated<Item>> {
        let items = self.uow.items();
        let (page, total) = futures::try_join!(
            items.list(params.offset(), params.limit()),
            items.count()
        )?;

        Ok(Paginated::new(page, &params, total))
    }

    async fn list_user_items(&self, owner_id: Uuid, params: PaginationParams) -> AppResult<Paginated<Item>> {
        let items = self.uow.items();
        let (page, total) = futures::try_join!(
            items.list_by_owner(owner_id, params.offset(), params.limit()),
            items.count_by_owner(owner_id)
        )?;

        Ok(Paginated::new(page, &params, total))
    }

    async fn create_item(&self, new_item: NewItem) -> AppResult<Item> {
        let item = self.uow.items().create(new_item).await?;
        tracing::debug!(item_id = %item.id, owner_id = %item.owner_id, "Item created");
        Ok(item)
    }

    async fn update_item(&self, id: Uuid, changes: ItemChanges) -> AppResult<Item> {
        let items = self.uow.items();
        let pattern = format!("{}*", Self::key(id));

        invalidating(self.cache.as_ref(), &pattern, items.update(id, changes)).await
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<()> {
        let items = self.uow.items();
        let pattern = format!("{}*", Self::key(id));

        invalidating(self.cache.as_ref(), &pattern, items.delete(id)).await
    }
}
