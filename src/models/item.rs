// src/models/item.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::pricing::{compute_total_price, StockOperation, StockRuleError};

pub const MAX_IMAGES_PER_ITEM: usize = 5;
pub const DEFAULT_STOCK_UNIT: &str = "Unit";

// --- Item de estoque (a única entidade) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub item_name: String,
    pub item_code: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub stock_unit: String,
    pub total_units: i64,
    pub purchase_price: Decimal, // Sempre sem imposto
    pub gst_rate: Decimal,
    pub is_inclusive: bool,
    pub total_price: Decimal, // Derivado, nunca vem do cliente
    pub low_stock_warning: bool,
    pub low_stock_quantity: i64,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_low_stock(&self) -> bool {
        self.low_stock_warning && self.total_units < self.low_stock_quantity
    }
}

// ---
// Validação Customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("exclusive_min".into(), &0.0);
        err.message = Some("O preço de compra deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some("O campo é obrigatório.".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn field_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let message: String = message.into();
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

// ---
// Rascunho: todos os campos editáveis de um item, já tipados
// ---
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ItemDraft {
    #[validate(custom(function = "validate_not_blank"))]
    pub item_name: String,
    pub item_code: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub category: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub stock_unit: String,
    #[validate(range(min = 0, message = "O total de unidades não pode ser negativo."))]
    pub total_units: i64,
    #[validate(custom(function = "validate_positive"))]
    pub purchase_price: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub gst_rate: Decimal,
    pub is_inclusive: bool,
    pub low_stock_warning: bool,
    #[validate(range(min = 0, message = "A quantidade de alerta não pode ser negativa."))]
    pub low_stock_quantity: i64,
    #[validate(length(max = 5, message = "São permitidas no máximo 5 imagens."))]
    pub images: Vec<String>,
}

impl ItemDraft {
    /// Regras que envolvem mais de um campo.
    pub fn validate_consistency(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        // Regra: com o alerta ligado, o limite precisa ser positivo.
        if self.low_stock_warning && self.low_stock_quantity <= 0 {
            errors.add(
                "low_stock_quantity",
                field_error(
                    "LowStockQuantityRequired",
                    "A quantidade de alerta de estoque baixo deve ser um número positivo.",
                ),
            );
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.validate_consistency()
    }

    pub fn total_price(&self) -> Result<Decimal, StockRuleError> {
        compute_total_price(
            self.total_units,
            self.purchase_price,
            self.gst_rate,
            self.is_inclusive,
        )
    }
}

// ---
// Patch: campos opcionais vindos do cliente (JSON ou multipart)
// ---
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub item_name: Option<String>,
    pub item_code: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub stock_unit: Option<String>,
    pub total_units: Option<i64>,
    pub purchase_price: Option<Decimal>,
    pub gst_rate: Option<Decimal>,
    pub is_inclusive: Option<bool>,
    pub low_stock_warning: Option<bool>,
    pub low_stock_quantity: Option<i64>,
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

// Texto vazio em campo opcional significa "sem valor".
fn optional_text(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

impl ItemPatch {
    /// Monta o rascunho de um item novo. Campos obrigatórios ausentes viram erro de validação.
    pub fn into_new_draft(self) -> Result<ItemDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.item_name.as_deref().is_none_or(|s| s.trim().is_empty()) {
            errors.add("item_name", field_error("required", "O nome do item é obrigatório."));
        }
        if self.category.as_deref().is_none_or(|s| s.trim().is_empty()) {
            errors.add("category", field_error("required", "A categoria é obrigatória."));
        }
        if self.purchase_price.is_none() {
            errors.add(
                "purchase_price",
                field_error("required", "O preço de compra é obrigatório."),
            );
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ItemDraft {
            item_name: self.item_name.map(trimmed).unwrap_or_default(),
            item_code: self.item_code.and_then(optional_text),
            category: self.category.map(trimmed).unwrap_or_default(),
            description: self.description.and_then(optional_text),
            stock_unit: self
                .stock_unit
                .and_then(optional_text)
                .unwrap_or_else(|| DEFAULT_STOCK_UNIT.to_string()),
            total_units: self.total_units.unwrap_or(0),
            purchase_price: self.purchase_price.unwrap_or_default(),
            gst_rate: self.gst_rate.unwrap_or(Decimal::ZERO),
            is_inclusive: self.is_inclusive.unwrap_or(false),
            low_stock_warning: self.low_stock_warning.unwrap_or(false),
            low_stock_quantity: self.low_stock_quantity.unwrap_or(0),
            images: Vec::new(),
        })
    }

    /// Aplica o patch sobre um item existente.
    pub fn apply_to(self, current: &Item) -> ItemDraft {
        ItemDraft {
            item_name: self.item_name.map(trimmed).unwrap_or_else(|| current.item_name.clone()),
            item_code: match self.item_code {
                Some(code) => optional_text(code),
                None => current.item_code.clone(),
            },
            category: self.category.map(trimmed).unwrap_or_else(|| current.category.clone()),
            description: match self.description {
                Some(text) => optional_text(text),
                None => current.description.clone(),
            },
            stock_unit: self
                .stock_unit
                .and_then(optional_text)
                .unwrap_or_else(|| current.stock_unit.clone()),
            total_units: self.total_units.unwrap_or(current.total_units),
            purchase_price: self.purchase_price.unwrap_or(current.purchase_price),
            gst_rate: self.gst_rate.unwrap_or(current.gst_rate),
            is_inclusive: self.is_inclusive.unwrap_or(current.is_inclusive),
            low_stock_warning: self.low_stock_warning.unwrap_or(current.low_stock_warning),
            low_stock_quantity: self.low_stock_quantity.unwrap_or(current.low_stock_quantity),
            images: current.images.clone(),
        }
    }
}

// ---
// Registros que o repositório recebe
// ---

/// Item pronto para inserir, com totalPrice já calculado.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub draft: ItemDraft,
    pub total_price: Decimal,
}

impl NewItem {
    pub fn priced(draft: ItemDraft) -> Result<Self, StockRuleError> {
        let total_price = draft.total_price()?;
        Ok(Self { draft, total_price })
    }
}

/// Atualização parcial. `None` mantém o valor atual.
/// Nos campos anuláveis, `Some(None)` limpa o valor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub item_name: Option<String>,
    pub item_code: Option<Option<String>>,
    pub category: Option<String>,
    pub description: Option<Option<String>>,
    pub stock_unit: Option<String>,
    pub total_units: Option<i64>,
    pub purchase_price: Option<Decimal>,
    pub gst_rate: Option<Decimal>,
    pub is_inclusive: Option<bool>,
    pub total_price: Option<Decimal>,
    pub low_stock_warning: Option<bool>,
    pub low_stock_quantity: Option<i64>,
    pub images: Option<Vec<String>>,
}

impl ItemChanges {
    /// Snapshot completo dos campos de preço. Os cinco campos são gravados juntos,
    /// então a linha persistida sempre respeita a fórmula do totalPrice.
    pub fn priced(
        total_units: i64,
        purchase_price: Decimal,
        gst_rate: Decimal,
        is_inclusive: bool,
    ) -> Result<Self, StockRuleError> {
        let total_price = compute_total_price(total_units, purchase_price, gst_rate, is_inclusive)?;
        Ok(Self {
            total_units: Some(total_units),
            purchase_price: Some(purchase_price),
            gst_rate: Some(gst_rate),
            is_inclusive: Some(is_inclusive),
            total_price: Some(total_price),
            ..Self::default()
        })
    }

    /// Todos os campos do rascunho.
    pub fn from_draft(draft: ItemDraft) -> Result<Self, StockRuleError> {
        let mut changes = Self::priced(
            draft.total_units,
            draft.purchase_price,
            draft.gst_rate,
            draft.is_inclusive,
        )?;
        changes.item_name = Some(draft.item_name);
        changes.item_code = Some(draft.item_code);
        changes.category = Some(draft.category);
        changes.description = Some(draft.description);
        changes.stock_unit = Some(draft.stock_unit);
        changes.low_stock_warning = Some(draft.low_stock_warning);
        changes.low_stock_quantity = Some(draft.low_stock_quantity);
        changes.images = Some(draft.images);
        Ok(changes)
    }

    /// Aplica as mudanças em memória (usado pelo repositório em memória).
    pub fn apply(self, item: &mut Item) {
        if let Some(v) = self.item_name {
            item.item_name = v;
        }
        if let Some(v) = self.item_code {
            item.item_code = v;
        }
        if let Some(v) = self.category {
            item.category = v;
        }
        if let Some(v) = self.description {
            item.description = v;
        }
        if let Some(v) = self.stock_unit {
            item.stock_unit = v;
        }
        if let Some(v) = self.total_units {
            item.total_units = v;
        }
        if let Some(v) = self.purchase_price {
            item.purchase_price = v;
        }
        if let Some(v) = self.gst_rate {
            item.gst_rate = v;
        }
        if let Some(v) = self.is_inclusive {
            item.is_inclusive = v;
        }
        if let Some(v) = self.total_price {
            item.total_price = v;
        }
        if let Some(v) = self.low_stock_warning {
            item.low_stock_warning = v;
        }
        if let Some(v) = self.low_stock_quantity {
            item.low_stock_quantity = v;
        }
        if let Some(v) = self.images {
            item.images = v;
        }
    }
}

// ---
// Listagem e estoque
// ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub low_stock_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: i64,
}

/// Corpo do endpoint de estoque: valor absoluto ou ajuste relativo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StockUpdate {
    #[serde(rename_all = "camelCase")]
    Adjust {
        operation: StockOperation,
        quantity: i64,
    },
    #[serde(rename_all = "camelCase")]
    Set { total_units: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            item_name: "Parafuso".into(),
            item_code: Some("PF-01".into()),
            category: "Ferragens".into(),
            description: None,
            stock_unit: "Box".into(),
            total_units: 10,
            purchase_price: Decimal::from(100),
            gst_rate: Decimal::from(18),
            is_inclusive: false,
            total_price: Decimal::from(1180),
            low_stock_warning: true,
            low_stock_quantity: 4,
            images: vec!["http://localhost/uploads/a.png".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_draft_requires_name_category_and_price() {
        let errors = ItemPatch::default().into_new_draft().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("item_name"));
        assert!(fields.contains_key("category"));
        assert!(fields.contains_key("purchase_price"));
    }

    #[test]
    fn new_draft_applies_defaults() {
        let draft = ItemPatch {
            item_name: Some("  Cabo  ".into()),
            category: Some("Elétrica".into()),
            purchase_price: Some(Decimal::from(20)),
            item_code: Some("".into()),
            ..ItemPatch::default()
        }
        .into_new_draft()
        .unwrap();

        assert_eq!(draft.item_name, "Cabo");
        assert_eq!(draft.item_code, None);
        assert_eq!(draft.stock_unit, DEFAULT_STOCK_UNIT);
        assert_eq!(draft.total_units, 0);
        assert_eq!(draft.gst_rate, Decimal::ZERO);
        assert!(!draft.is_inclusive);
        assert!(draft.validate_all().is_ok());
    }

    #[test]
    fn draft_rejects_non_positive_price_and_negative_units() {
        let mut draft = ItemPatch::default().apply_to(&sample_item());
        draft.purchase_price = Decimal::ZERO;
        draft.total_units = -1;

        let errors = draft.validate_all().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("purchase_price"));
        assert!(fields.contains_key("total_units"));
    }

    #[test]
    fn low_stock_warning_requires_positive_threshold() {
        let mut draft = ItemPatch::default().apply_to(&sample_item());
        draft.low_stock_quantity = 0;

        let errors = draft.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("low_stock_quantity"));

        draft.low_stock_warning = false;
        assert!(draft.validate_all().is_ok());
    }

    #[test]
    fn patch_keeps_unset_fields_and_clears_empty_optionals() {
        let current = sample_item();
        let draft = ItemPatch {
            item_code: Some(" ".into()),
            gst_rate: Some(Decimal::from(5)),
            ..ItemPatch::default()
        }
        .apply_to(&current);

        assert_eq!(draft.item_name, current.item_name);
        assert_eq!(draft.item_code, None);
        assert_eq!(draft.gst_rate, Decimal::from(5));
        assert_eq!(draft.images, current.images);
        assert_eq!(draft.total_price(), Ok(Decimal::from(1050)));
    }

    #[test]
    fn priced_changes_carry_consistent_total() {
        let changes = ItemChanges::priced(4, Decimal::from(50), Decimal::from(10), false).unwrap();
        assert_eq!(changes.total_price, Some(Decimal::from(220)));
        assert_eq!(changes.item_name, None);

        let mut item = sample_item();
        changes.apply(&mut item);
        assert_eq!(item.total_units, 4);
        assert_eq!(item.total_price, Decimal::from(220));
        assert_eq!(item.item_name, "Parafuso");
    }

    #[test]
    fn unpriceable_draft_cannot_become_a_new_item() {
        let mut draft = ItemPatch::default().apply_to(&sample_item());
        draft.total_units = 1_000_000_000_000_000_000;
        draft.purchase_price = Decimal::from(100_000_000_000_i64);

        assert_eq!(NewItem::priced(draft.clone()), Err(StockRuleError::TotalPriceOverflow));
        assert_eq!(ItemChanges::from_draft(draft), Err(StockRuleError::TotalPriceOverflow));
    }

    #[test]
    fn low_stock_needs_flag_and_threshold() {
        let mut item = sample_item();
        assert!(!item.is_low_stock());
        item.total_units = 3;
        assert!(item.is_low_stock());
        item.low_stock_warning = false;
        assert!(!item.is_low_stock());
    }

    #[test]
    fn stock_update_accepts_both_shapes() {
        let adjust: StockUpdate =
            serde_json::from_str(r#"{"operation":"increase","quantity":5}"#).unwrap();
        assert_eq!(
            adjust,
            StockUpdate::Adjust { operation: StockOperation::Increase, quantity: 5 }
        );

        let set: StockUpdate =
            serde_json::from_str(r#"{"totalUnits":12,"totalPrice":999}"#).unwrap();
        assert_eq!(set, StockUpdate::Set { total_units: 12 });
    }
}
