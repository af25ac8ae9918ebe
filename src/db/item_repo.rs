// src/db/item_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::item::{Item, ItemChanges, ItemFilter, NewItem},
};

/// Contrato de persistência dos itens.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Página 1-indexada, em ordem de inserção, e o total de itens do filtro.
    async fn list_page(
        &self,
        page: PageRequest,
        filter: ItemFilter,
    ) -> Result<(Vec<Item>, i64), AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError>;

    async fn insert(&self, item: NewItem) -> Result<Item, AppError>;

    /// `None` quando o id não existe.
    async fn update_by_id(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, AppError>;

    /// Devolve o item removido (as imagens dele ainda precisam ser liberadas).
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError>;
}

// O repositório de itens, responsável por todas as interações com a tabela 'items'
#[derive(Clone)]
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ItemFilter) {
        if filter.low_stock_only {
            builder.push(" WHERE low_stock_warning AND total_units < low_stock_quantity");
        }
    }
}

#[async_trait]
impl ItemStore for PgItemRepository {
    async fn list_page(
        &self,
        page: PageRequest,
        filter: ItemFilter,
    ) -> Result<(Vec<Item>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM items");
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at ASC, id ASC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let items = select.build_query_as::<Item>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn insert(&self, item: NewItem) -> Result<Item, AppError> {
        let NewItem { draft, total_price } = item;

        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                id, item_name, item_code, category, description, stock_unit,
                total_units, purchase_price, gst_rate, is_inclusive, total_price,
                low_stock_warning, low_stock_quantity, images
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(draft.item_name)
        .bind(draft.item_code)
        .bind(draft.category)
        .bind(draft.description)
        .bind(draft.stock_unit)
        .bind(draft.total_units)
        .bind(draft.purchase_price)
        .bind(draft.gst_rate)
        .bind(draft.is_inclusive)
        .bind(total_price)
        .bind(draft.low_stock_warning)
        .bind(draft.low_stock_quantity)
        .bind(draft.images)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_by_id(&self, id: Uuid, changes: ItemChanges) -> Result<Option<Item>, AppError> {
        // COALESCE mantém o valor atual quando o campo não veio.
        // Nos anuláveis, o booleano diz se o valor (mesmo NULL) deve ser gravado.
        let updated = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                item_name          = COALESCE($2::text, item_name),
                item_code          = CASE WHEN $3::boolean THEN $4::text ELSE item_code END,
                category           = COALESCE($5::text, category),
                description        = CASE WHEN $6::boolean THEN $7::text ELSE description END,
                stock_unit         = COALESCE($8::text, stock_unit),
                total_units        = COALESCE($9::bigint, total_units),
                purchase_price     = COALESCE($10::numeric, purchase_price),
                gst_rate           = COALESCE($11::numeric, gst_rate),
                is_inclusive       = COALESCE($12::boolean, is_inclusive),
                total_price        = COALESCE($13::numeric, total_price),
                low_stock_warning  = COALESCE($14::boolean, low_stock_warning),
                low_stock_quantity = COALESCE($15::bigint, low_stock_quantity),
                images             = COALESCE($16::text[], images),
                updated_at         = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.item_name)
        .bind(changes.item_code.is_some())
        .bind(changes.item_code.flatten())
        .bind(changes.category)
        .bind(changes.description.is_some())
        .bind(changes.description.flatten())
        .bind(changes.stock_unit)
        .bind(changes.total_units)
        .bind(changes.purchase_price)
        .bind(changes.gst_rate)
        .bind(changes.is_inclusive)
        .bind(changes.total_price)
        .bind(changes.low_stock_warning)
        .bind(changes.low_stock_quantity)
        .bind(changes.images)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        let deleted = sqlx::query_as::<_, Item>("DELETE FROM items WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deleted)
    }
}
