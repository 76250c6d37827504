//! # Workflow Requests
//!
//! Inputs to the transaction orchestrator and the records each workflow
//! hands back after commit.
//!
//! ```text
//!  NewProduct ───────────► insert_product() ─► Product
//!  SaleRequest ──────────► sale()          ──► RecordedSale
//!  PurchaseRequest ──────► purchase()      ──► RecordedPurchase
//!  ExpenseRequest ───────► expense()       ──► Expense
//!  TransferRequest ──────► transfer()      ──► RecordedTransfer
//!  StaffPaymentRequest ──► staff_payment() ──► RecordedStaffPayment
//!  StockAdjustment ──────► adjust()        ──► StockPosition
//! ```
//!
//! Each request has a `validate` that runs the input rules before any
//! unit of work is opened.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{
    CashPosition, Expense, PaymentMethod, ProductNature, Purchase, PurchaseItem, SalaryPayment,
    Sale, SaleItem, StockPosition, StockReason, StockTransfer,
};
use crate::validation::{
    validate_adjust_reason, validate_amount, validate_id, validate_line_count, validate_price,
    validate_product_name, validate_quantity, validate_quantity_change, validate_store_id,
    validate_text, validate_transfer_stores, validate_units_per_box,
};

// =============================================================================
// Catalog
// =============================================================================

/// A product to add to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub nature: ProductNature,
    pub units_per_box: i64,
    /// Price of one box.
    pub purchase_price: Money,
    /// Price of one base unit.
    pub selling_price: Money,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        units_per_box: i64,
        purchase_price: Money,
        selling_price: Money,
    ) -> Self {
        NewProduct {
            id: None,
            name: name.into(),
            nature: ProductNature::FinishedGood,
            units_per_box,
            purchase_price,
            selling_price,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn nature(mut self, nature: ProductNature) -> Self {
        self.nature = nature;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if let Some(id) = &self.id {
            validate_id("id", id)?;
        }
        validate_product_name(&self.name)?;
        validate_units_per_box(self.units_per_box)?;
        validate_price("purchase_price", self.purchase_price)?;
        validate_price("selling_price", self.selling_price)?;
        Ok(())
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    /// Base units sold.
    pub quantity: i64,
}

impl SaleLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub store_id: String,
    pub items: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    pub actor_id: Option<String>,
    pub notes: Option<String>,
}

impl SaleRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_store_id(&self.store_id)?;
        validate_line_count(self.items.len())?;
        for line in &self.items {
            validate_id("product_id", &line.product_id)?;
            validate_quantity(line.quantity)?;
        }
        Ok(())
    }
}

/// A committed sale with its line items in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: String,
    /// Purchase units (boxes).
    pub quantity_boxes: i64,
    pub unit_price_box: Money,
}

impl PurchaseLine {
    pub fn new(product_id: impl Into<String>, quantity_boxes: i64, unit_price_box: Money) -> Self {
        PurchaseLine {
            product_id: product_id.into(),
            quantity_boxes,
            unit_price_box,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub store_id: String,
    pub supplier_id: Option<String>,
    pub items: Vec<PurchaseLine>,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
}

impl PurchaseRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_store_id(&self.store_id)?;
        validate_line_count(self.items.len())?;
        for line in &self.items {
            validate_id("product_id", &line.product_id)?;
            validate_quantity(line.quantity_boxes)?;
            validate_price("unit_price_box", line.unit_price_box)?;
        }
        Ok(())
    }
}

/// A committed purchase.
///
/// `expense` is the journal copy of the cash outflow; absent when the
/// purchase cost nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPurchase {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub expense: Option<Expense>,
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub store_id: String,
    pub description: String,
    pub amount: Money,
    pub actor_id: Option<String>,
}

impl ExpenseRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_store_id(&self.store_id)?;
        validate_text("description", &self.description, 500)?;
        validate_amount(self.amount)
    }
}

// =============================================================================
// Transfer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub product_id: String,
    pub from_store_id: String,
    pub to_store_id: String,
    /// Base units moved.
    pub quantity: i64,
    pub actor_id: Option<String>,
    pub notes: Option<String>,
}

impl TransferRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_id("product_id", &self.product_id)?;
        validate_transfer_stores(&self.from_store_id, &self.to_store_id)?;
        validate_quantity(self.quantity)?;
        Ok(())
    }
}

/// Both sides of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedTransfer {
    pub transfer: StockTransfer,
    pub from_position: StockPosition,
    pub to_position: StockPosition,
}

// =============================================================================
// Staff Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPaymentRequest {
    /// Staff member being paid.
    pub user_id: String,
    pub store_id: String,
    pub amount: Money,
    pub period: String,
    pub actor_id: Option<String>,
}

impl StaffPaymentRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_id("user_id", &self.user_id)?;
        validate_store_id(&self.store_id)?;
        validate_text("period", &self.period, 50)?;
        validate_amount(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedStaffPayment {
    pub payment: SalaryPayment,
    pub expense: Expense,
    pub cash: CashPosition,
}

// =============================================================================
// Manual Adjustment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub store_id: String,
    /// Signed base units.
    pub delta: i64,
    pub reason: StockReason,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
}

impl StockAdjustment {
    pub fn validate(&self) -> CoreResult<()> {
        validate_id("product_id", &self.product_id)?;
        validate_store_id(&self.store_id)?;
        validate_quantity_change(self.delta)?;
        validate_adjust_reason(self.reason)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
