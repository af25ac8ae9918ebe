// src/services/pricing.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---
// Regra de preço e de estoque
// ---
// Funções puras. Todo caminho que altera totalUnits, purchasePrice, gstRate ou
// isInclusive passa por aqui antes de persistir.

/// Direção do ajuste de estoque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Increase,
    Decrease,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockRuleError {
    #[error("A quantidade do ajuste não pode ser negativa ({0}).")]
    NegativeQuantity(i64),

    #[error("Estoque insuficiente: disponível {available}, solicitado {requested}.")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("A quantidade resultante excede o limite suportado.")]
    QuantityOverflow,

    #[error("O preço total excede o limite suportado.")]
    TotalPriceOverflow,
}

/// Multiplicador do GST: 1 quando o preço já inclui o imposto.
pub fn gst_multiplier(gst_rate: Decimal, is_inclusive: bool) -> Decimal {
    if is_inclusive {
        Decimal::ONE
    } else {
        Decimal::ONE + gst_rate / Decimal::ONE_HUNDRED
    }
}

/// totalPrice = totalUnits * purchasePrice * multiplicador
///
/// Produto fora da faixa do `Decimal` vira erro, nunca pânico.
pub fn compute_total_price(
    total_units: i64,
    purchase_price: Decimal,
    gst_rate: Decimal,
    is_inclusive: bool,
) -> Result<Decimal, StockRuleError> {
    Decimal::from(total_units)
        .checked_mul(purchase_price)
        .and_then(|subtotal| subtotal.checked_mul(gst_multiplier(gst_rate, is_inclusive)))
        .ok_or(StockRuleError::TotalPriceOverflow)
}

/// Aplica um ajuste de estoque. Estoque negativo é rejeitado, nunca truncado em zero.
pub fn apply_stock_delta(
    current_units: i64,
    operation: StockOperation,
    delta: i64,
) -> Result<i64, StockRuleError> {
    if delta < 0 {
        return Err(StockRuleError::NegativeQuantity(delta));
    }

    match operation {
        StockOperation::Increase => current_units
            .checked_add(delta)
            .ok_or(StockRuleError::QuantityOverflow),
        StockOperation::Decrease => {
            if delta > current_units {
                return Err(StockRuleError::InsufficientStock {
                    available: current_units,
                    requested: delta,
                });
            }
            Ok(current_units - delta)
        }
    }
}
