//! # Report Types
//!
//! Read-side shapes produced by the valuation reconstructor and the report
//! queries, plus the arithmetic that fills them.
//!
//! Valuations price quantities at the product's *current* unit cost and
//! selling price. Point-in-time accuracy applies to quantities only.
//!
//! Cost value is `purchase_price × quantity / units_per_box`, rounded once,
//! so a full box is always worth exactly its purchase price. Every sum is
//! checked and fails with `OutOfRange` instead of wrapping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;

// =============================================================================
// Valuation
// =============================================================================

/// Value of one product's quantity in one scope (a store, or all stores).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductValuation {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub selling_price: Money,
    pub cost_value: Money,
    pub potential_revenue: Money,
}

impl ProductValuation {
    pub fn new(product: &Product, quantity: i64) -> CoreResult<Self> {
        let cost_value = product
            .purchase_price
            .checked_prorate(quantity, product.units_per_box)
            .ok_or_else(|| overflow("cost_value"))?;
        let potential_revenue = product
            .selling_price
            .checked_mul_quantity(quantity)
            .ok_or_else(|| overflow("potential_revenue"))?;

        Ok(ProductValuation {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_cost: product.unit_cost(),
            selling_price: product.selling_price,
            cost_value,
            potential_revenue,
        })
    }
}

/// Totals of a valuation plus the per-product breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockValuation {
    pub store_id: Option<String>,
    /// `None` for a valuation of live positions.
    pub as_of: Option<DateTime<Utc>>,
    pub total_cost_value: Money,
    pub total_potential_revenue: Money,
    pub per_product: Vec<ProductValuation>,
}

impl StockValuation {
    pub fn from_products(
        store_id: Option<String>,
        as_of: Option<DateTime<Utc>>,
        per_product: Vec<ProductValuation>,
    ) -> CoreResult<Self> {
        let mut total_cost_value = Money::zero();
        let mut total_potential_revenue = Money::zero();
        for product in &per_product {
            total_cost_value = total_cost_value
                .checked_add(product.cost_value)
                .ok_or_else(|| overflow("total_cost_value"))?;
            total_potential_revenue = total_potential_revenue
                .checked_add(product.potential_revenue)
                .ok_or_else(|| overflow("total_potential_revenue"))?;
        }

        Ok(StockValuation {
            store_id,
            as_of,
            total_cost_value,
            total_potential_revenue,
            per_product,
        })
    }
}

// =============================================================================
// Stock Health
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Out,
    Low,
    Ok,
}

impl StockStatus {
    /// OUT at zero, LOW at or below `threshold`, OK above.
    pub fn classify(quantity: i64, threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::Out
        } else if quantity <= threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }
}

/// One stock position as seen by the health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHealthEntry {
    pub product_id: String,
    pub product_name: String,
    pub store_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub selling_price: Money,
    pub total_value: Money,
    pub potential_revenue: Money,
    /// potential revenue − total value.
    pub margin: Money,
    pub status: StockStatus,
}

impl StockHealthEntry {
    pub fn new(
        product: &Product,
        store_id: impl Into<String>,
        quantity: i64,
        threshold: i64,
    ) -> CoreResult<Self> {
        let valuation = ProductValuation::new(product, quantity)?;
        let margin = valuation
            .potential_revenue
            .checked_sub(valuation.cost_value)
            .ok_or_else(|| overflow("margin"))?;

        Ok(StockHealthEntry {
            product_id: valuation.product_id,
            product_name: valuation.product_name,
            store_id: store_id.into(),
            quantity,
            unit_cost: valuation.unit_cost,
            selling_price: valuation.selling_price,
            total_value: valuation.cost_value,
            potential_revenue: valuation.potential_revenue,
            margin,
            status: StockStatus::classify(quantity, threshold),
        })
    }
}

// =============================================================================
// Sales & Capital
// =============================================================================

/// Completed sales of one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySalesReport {
    pub date: NaiveDate,
    pub store_id: Option<String>,
    pub total_revenue: Money,
    /// Σ (unit price − unit cost snapshot) × quantity.
    pub total_profit: Money,
    pub transaction_count: i64,
    pub items_sold: i64,
}

/// Cash on hand plus stock at current cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCapital {
    pub store_id: Option<String>,
    pub liquid_assets: Money,
    pub stock_value: Money,
    pub global_capital: Money,
}

impl GlobalCapital {
    pub fn new(
        store_id: Option<String>,
        liquid_assets: Money,
        stock_value: Money,
    ) -> CoreResult<Self> {
        let global_capital = liquid_assets
            .checked_add(stock_value)
            .ok_or_else(|| overflow("global_capital"))?;

        Ok(GlobalCapital {
            store_id,
            liquid_assets,
            stock_value,
            global_capital,
        })
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
