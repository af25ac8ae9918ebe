// src/db/memory_repo.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::item_repo::ItemStore,
    models::item::{Item, ItemChanges, ItemFilter, NewItem},
};

// Repositório em memória (STORAGE_BACKEND=memory e testes).
// O Vec preserva a ordem de inserção, igual ao ORDER BY created_at do Postgres.
#[derive(Default)]
pub struct MemoryItemRepository {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for MemoryItemRepository {
    async fn list_page(
        &self,
        page: PageRequest,
        filter: ItemFilter,
    ) -> Result<(Vec<Item>, i64), AppError> {
        let items = self.items.read().await;
        let matching: Vec<&Item> = items
            .iter()
            .filter(|item| !filter.low_stock_only || item.is_low_stock())
            .collect();

        let total = matching.len() as i64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let page_items = matching
            .into_iter()
            .skip(skip)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok((page_items, total))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| item.id == id).cloned())
    }

    async fn insert(&self, item: NewItem) -> Result<Item, AppError> {
        let NewItem { draft, total_price } = item;
        let now = Utc::now();

        let created = Item {
            id: Uuid::new_v4(),
            item_name: draft.item_name,
            item_code: draft.item_code,
            category: draft.category,
            description: draft.description,
            stock_unit: draft.stock_unit,
            total_units: draft.total_units,
            purchase_price: draft.purchase_price,
            gst_rate: draft.gst_rate,
            is_inclusive: draft.is_inclusive,
            total_price,
            low_stock_warning: draft.low_stock_warning,
            low_stock_quantity: draft.low_stock_quantity,
            images: draft.images,
            created_at: now,
            updated_at: now,
        };

        self.items.write().await.push(created.clone());
        Ok(created)
    }

    async fn update_by_id(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, AppError> {
        let mut items = self.items.write().await;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };

        changes.apply(item);
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        let mut items = self.items.write().await;
        let removed = items
            .iter()
            .position(|item| item.id == id)
            .map(|index| items.remove(index));
        Ok(removed)
    }
}
