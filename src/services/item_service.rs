// src/services/item_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::ItemStore,
    models::item::{
        field_error, Item, ItemChanges, ItemFilter, ItemPage, ItemPatch, NewItem, StockUpdate,
        MAX_IMAGES_PER_ITEM,
    },
    services::pricing::apply_stock_delta,
    storage::{ImageKind, ImageStore, UploadedImage},
};

// Único ponto de escrita dos itens: toda gravação passa pela regra de preço.
#[derive(Clone)]
pub struct ItemService {
    repo: Arc<dyn ItemStore>,
    images: Arc<dyn ImageStore>,
}

fn images_error(code: &'static str, message: &str) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("images", field_error(code, message));
    AppError::ValidationError(errors)
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { repo, images }
    }

    // --- LISTAGEM ---
    pub async fn list_items(
        &self,
        page: PageRequest,
        filter: ItemFilter,
    ) -> Result<ItemPage, AppError> {
        let (items, total) = self.repo.list_page(page, filter).await?;
        Ok(ItemPage { items, total })
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item, AppError> {
        self.repo.get_by_id(id).await?.ok_or(AppError::ItemNotFound(id))
    }

    // --- CREATE ITEM ---
    pub async fn create_item(
        &self,
        patch: ItemPatch,
        uploads: Vec<UploadedImage>,
    ) -> Result<Item, AppError> {
        let draft = patch.into_new_draft()?;
        draft.validate_all()?;
        // Preço calculado antes de gravar qualquer arquivo
        let mut new_item = NewItem::priced(draft)?;

        if uploads.is_empty() {
            return Err(images_error("ImageRequired", "Envie pelo menos uma imagem."));
        }
        let kinds = Self::check_uploads(&uploads)?;

        let urls = self.store_images(&uploads, &kinds).await?;
        new_item.draft.images = urls.clone();

        match self.repo.insert(new_item).await {
            Ok(item) => {
                tracing::info!(item_id = %item.id, total_price = %item.total_price, "Item criado");
                Ok(item)
            }
            Err(e) => {
                // O item não existe, então as imagens gravadas ficariam órfãs.
                self.release_images(&urls).await;
                Err(e)
            }
        }
    }

    // --- UPDATE ITEM ---
    /// Edição completa ou parcial. Imagens novas substituem a lista anterior.
    pub async fn update_item(
        &self,
        id: Uuid,
        patch: ItemPatch,
        uploads: Vec<UploadedImage>,
    ) -> Result<Item, AppError> {
        let current = self.get_item(id).await?;

        let draft = patch.apply_to(&current);
        draft.validate_all()?;
        let mut changes = ItemChanges::from_draft(draft)?;

        let kinds = Self::check_uploads(&uploads)?;
        let new_urls = self.store_images(&uploads, &kinds).await?;
        if !uploads.is_empty() {
            changes.images = Some(new_urls.clone());
        }

        let updated = match self.repo.update_by_id(id, changes).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                self.release_images(&new_urls).await;
                return Err(AppError::ItemNotFound(id));
            }
            Err(e) => {
                self.release_images(&new_urls).await;
                return Err(e);
            }
        };

        if !uploads.is_empty() {
            let replaced: Vec<String> = current
                .images
                .into_iter()
                .filter(|url| !updated.images.contains(url))
                .collect();
            self.release_images(&replaced).await;
        }

        tracing::info!(item_id = %id, total_price = %updated.total_price, "Item atualizado");
        Ok(updated)
    }

    // --- ESTOQUE ---
    /// Ajuste relativo (increase/decrease) ou valor absoluto.
    /// O totalPrice é recalculado nos dois casos.
    pub async fn update_stock(&self, id: Uuid, update: StockUpdate) -> Result<Item, AppError> {
        let current = self.get_item(id).await?;

        let new_units = match update {
            StockUpdate::Adjust { operation, quantity } => {
                apply_stock_delta(current.total_units, operation, quantity)?
            }
            StockUpdate::Set { total_units } => {
                if total_units < 0 {
                    let mut errors = ValidationErrors::new();
                    errors.add(
                        "total_units",
                        field_error("range", "O total de unidades não pode ser negativo."),
                    );
                    return Err(AppError::ValidationError(errors));
                }
                total_units
            }
        };

        let changes = ItemChanges::priced(
            new_units,
            current.purchase_price,
            current.gst_rate,
            current.is_inclusive,
        )?;

        let updated = self
            .repo
            .update_by_id(id, changes)
            .await?
            .ok_or(AppError::ItemNotFound(id))?;

        tracing::info!(
            item_id = %id,
            from = current.total_units,
            to = updated.total_units,
            "Estoque atualizado"
        );
        Ok(updated)
    }

    // --- DELETE ITEM ---
    pub async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        let removed = self
            .repo
            .delete_by_id(id)
            .await?
            .ok_or(AppError::ItemNotFound(id))?;

        self.release_images(&removed.images).await;
        tracing::info!(item_id = %id, "Item removido");
        Ok(())
    }

    // ---
    // Imagens
    // ---

    fn check_uploads(uploads: &[UploadedImage]) -> Result<Vec<ImageKind>, AppError> {
        if uploads.len() > MAX_IMAGES_PER_ITEM {
            return Err(images_error(
                "TooManyImages",
                "São permitidas no máximo 5 imagens.",
            ));
        }
        uploads.iter().map(UploadedImage::detect_kind).collect()
    }

    async fn store_images(
        &self,
        uploads: &[UploadedImage],
        kinds: &[ImageKind],
    ) -> Result<Vec<String>, AppError> {
        let mut urls = Vec::with_capacity(uploads.len());
        for (upload, kind) in uploads.iter().zip(kinds) {
            match self.images.store(upload, *kind).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.release_images(&urls).await;
                    return Err(e);
                }
            }
        }
        Ok(urls)
    }

    // Limpeza best-effort: falha aqui só gera log.
    async fn release_images(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.images.remove(url).await {
                tracing::warn!(url = %url, error = %e, "Falha ao remover imagem");
            }
        }
    }
}
