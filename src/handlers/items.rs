// src/handlers/items.rs

use std::{collections::HashMap, str::FromStr};

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, Multipart, Path, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    common::{
        error::AppError,
        pagination::{PageParams, PageRequest},
    },
    config::AppState,
    models::item::{field_error, ItemFilter, ItemPatch, StockUpdate},
    storage::UploadedImage,
};

// ---
// Extrator: ItemSubmission
// ---
// Aceita multipart/form-data (formulário com imagens) ou JSON (só campos).
#[derive(Debug, Default)]
pub struct ItemSubmission {
    pub patch: ItemPatch,
    pub images: Vec<UploadedImage>,
}

impl<S> FromRequest<S> for ItemSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidPayload(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        let Json(patch) = Json::<ItemPatch>::from_request(req, state)
            .await
            .map_err(json_error)?;
        Ok(Self { patch, images: Vec::new() })
    }
}

fn json_error(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    AppError::InvalidPayload(rejection.body_text())
}

// Id fora do formato UUID e query inválida também respondem em JSON.
fn path_error(rejection: PathRejection) -> AppError {
    AppError::InvalidPayload(rejection.body_text())
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError::InvalidPayload(rejection.body_text())
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    AppError::InvalidPayload(err.body_text())
}

async fn read_multipart(mut multipart: Multipart) -> Result<ItemSubmission, AppError> {
    let mut fields = HashMap::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" {
            let file_name = field.file_name().unwrap_or("imagem").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // Input de arquivo sem seleção chega como parte vazia
            if bytes.is_empty() {
                continue;
            }
            images.push(UploadedImage { file_name, content_type, bytes });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    let patch = patch_from_form(fields)?;
    Ok(ItemSubmission { patch, images })
}

// ---
// Conversão dos campos de texto do formulário
// ---

struct FormReader {
    fields: HashMap<String, String>,
    errors: ValidationErrors,
}

impl FormReader {
    fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    // Campo vazio conta como ausente
    fn non_empty(&mut self, name: &str) -> Option<String> {
        self.text(name).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&mut self, name: &str, key: &'static str, message: &str) -> Option<T> {
        let raw = self.non_empty(name)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                let message = format!("{message} (recebido: '{raw}')");
                self.errors.add(key, field_error("invalid", message));
                None
            }
        }
    }

    fn flag(&mut self, name: &str, key: &'static str) -> Option<bool> {
        let raw = self.non_empty(name)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => {
                let message = format!("Valor booleano inválido: '{raw}'.");
                self.errors.add(key, field_error("invalid", message));
                None
            }
        }
    }
}

/// Monta o patch a partir dos campos do multipart.
/// Campos desconhecidos (ex: totalPrice) são ignorados.
pub fn patch_from_form(fields: HashMap<String, String>) -> Result<ItemPatch, AppError> {
    let mut form = FormReader { fields, errors: ValidationErrors::new() };

    let patch = ItemPatch {
        item_name: form.text("itemName"),
        item_code: form.text("itemCode"),
        category: form.text("category"),
        description: form.text("description"),
        stock_unit: form.text("stockUnit"),
        total_units: form.parsed(
            "totalUnits",
            "total_units",
            "O total de unidades deve ser um número inteiro.",
        ),
        purchase_price: form.parsed::<Decimal>(
            "purchasePrice",
            "purchase_price",
            "O preço de compra deve ser um número.",
        ),
        gst_rate: form.parsed::<Decimal>(
            "gstRate",
            "gst_rate",
            "A alíquota de GST deve ser um número.",
        ),
        is_inclusive: form.flag("isInclusive", "is_inclusive"),
        low_stock_warning: form.flag("lowStockWarning", "low_stock_warning"),
        low_stock_quantity: form.parsed(
            "lowStockQuantity",
            "low_stock_quantity",
            "A quantidade de alerta deve ser um número inteiro.",
        ),
    };

    if form.errors.is_empty() {
        Ok(patch)
    } else {
        Err(AppError::ValidationError(form.errors))
    }
}

// ---
// Handlers
// ---

// GET /api/items?page=&limit=&lowStock=
pub async fn list_items(
    State(app_state): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query.map_err(query_error)?;
    let page = app_state
        .item_service
        .list_items(
            PageRequest::from(&params),
            ItemFilter { low_stock_only: params.low_stock },
        )
        .await?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/items/{id}
pub async fn get_item(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path.map_err(path_error)?;
    let item = app_state.item_service.get_item(id).await?;
    Ok((StatusCode::OK, Json(item)))
}

// POST /api/items
pub async fn create_item(
    State(app_state): State<AppState>,
    submission: ItemSubmission,
) -> Result<impl IntoResponse, AppError> {
    let new_item = app_state
        .item_service
        .create_item(submission.patch, submission.images)
        .await?;

    Ok((StatusCode::CREATED, Json(new_item)))
}

// PUT /api/items/{id}
pub async fn update_item(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    submission: ItemSubmission,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path.map_err(path_error)?;
    let updated = app_state
        .item_service
        .update_item(id, submission.patch, submission.images)
        .await?;

    Ok((StatusCode::OK, Json(updated)))
}

// PATCH|PUT /api/items/{id}/stock
pub async fn update_stock(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StockUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path.map_err(path_error)?;
    let Json(update) = payload.map_err(json_error)?;

    let updated = app_state.item_service.update_stock(id, update).await?;

    // Retorna o item atualizado para o frontend atualizar a tela
    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/items/{id}
pub async fn delete_item(
    State(app_state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path.map_err(path_error)?;
    app_state.item_service.delete_item(id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Item removido com sucesso." }))))
}
