//! # Domain Types
//!
//! Positions, movements and the workflow records that cause them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   1..n   ┌──────────────────────┐                 │
//! │  │  StockPosition  │─────────►│    StockMovement     │                 │
//! │  │  (product,store)│          │  prev + change = new │                 │
//! │  │  quantity >= 0  │          │  IN | OUT | ADJUST   │                 │
//! │  └─────────────────┘          └──────────────────────┘                 │
//! │                                                                         │
//! │  ┌─────────────────┐   1..n   ┌──────────────────────┐                 │
//! │  │  CashPosition   │─────────►│    CashMovement      │                 │
//! │  │  (store)        │          │  prev ± amount = new │                 │
//! │  │  balance >= 0   │          │  IN | OUT            │                 │
//! │  └─────────────────┘          └──────────────────────┘                 │
//! │                                                                         │
//! │  Workflow records (reference_id of the movements above):               │
//! │  Sale + SaleItem, Purchase + PurchaseItem, Expense,                    │
//! │  StockTransfer, SalaryPayment                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Positions are the only mutable rows. Movements and workflow records are
//! written once and never updated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Movement Kinds
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    /// Manual correction, either sign.
    Adjustment,
}

impl MovementType {
    /// IN for a positive change, OUT otherwise.
    pub fn from_change(quantity_change: i64) -> Self {
        if quantity_change > 0 {
            MovementType::In
        } else {
            MovementType::Out
        }
    }
}

/// Why a stock movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockReason {
    Purchase,
    Sale,
    Loss,
    Free,
    Adjustment,
    Initial,
    Transfer,
}

impl StockReason {
    /// Reasons a manual adjustment may carry.
    pub const MANUAL: [StockReason; 4] = [
        StockReason::Loss,
        StockReason::Free,
        StockReason::Adjustment,
        StockReason::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockReason::Purchase => "PURCHASE",
            StockReason::Sale => "SALE",
            StockReason::Loss => "LOSS",
            StockReason::Free => "FREE",
            StockReason::Adjustment => "ADJUSTMENT",
            StockReason::Initial => "INITIAL",
            StockReason::Transfer => "TRANSFER",
        }
    }

    /// Checks if the reason is accepted by a manual adjustment.
    pub fn is_manual(&self) -> bool {
        Self::MANUAL.contains(self)
    }
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashDirection {
    In,
    Out,
}

impl CashDirection {
    /// Applies the direction to an amount: IN adds, OUT subtracts.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            CashDirection::In => amount,
            CashDirection::Out => -amount,
        }
    }
}

/// Why a cash movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashReason {
    Sale,
    Expense,
    Purchase,
    OpeningBalance,
    StaffPayment,
}

// =============================================================================
// Positions
// =============================================================================

/// Current quantity of one product in one store, in base units.
///
/// A position that was never written reads as quantity 0 with no id and no
/// timestamps; only a movement materializes the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockPosition {
    pub id: Option<String>,
    pub product_id: String,
    pub store_id: String,
    pub quantity: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockPosition {
    /// The zero position of a key that has no row yet.
    pub fn unmaterialized(product_id: impl Into<String>, store_id: impl Into<String>) -> Self {
        StockPosition {
            id: None,
            product_id: product_id.into(),
            store_id: store_id.into(),
            quantity: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether the position exists as a row.
    pub fn is_materialized(&self) -> bool {
        self.id.is_some()
    }
}

/// Current cash balance of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashPosition {
    pub id: Option<String>,
    pub store_id: String,
    pub balance: Money,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CashPosition {
    /// The zero balance of a store that has no register row yet.
    pub fn unmaterialized(store_id: impl Into<String>) -> Self {
        CashPosition {
            id: None,
            store_id: store_id.into(),
            balance: Money::zero(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.id.is_some()
    }
}

// =============================================================================
// Movements
// =============================================================================

/// One immutable change to a stock position.
///
/// `entry_no` orders movements of the same position in write order;
/// `batch_no` is shared by every movement written in one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub entry_no: i64,
    pub batch_no: i64,
    pub stock_position_id: String,
    pub product_id: String,
    pub store_id: String,
    pub movement_type: MovementType,
    pub reason: StockReason,
    /// Positive for IN, negative for OUT. Always in base units.
    pub quantity_change: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    /// Sale, purchase, transfer or actor that caused the movement.
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// `new == previous + change` and `new >= 0`.
    pub fn is_consistent(&self) -> bool {
        self.previous_quantity.checked_add(self.quantity_change) == Some(self.new_quantity)
            && self.new_quantity >= 0
    }
}

/// One immutable change to a cash position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashMovement {
    pub id: String,
    pub entry_no: i64,
    pub batch_no: i64,
    pub cash_position_id: String,
    pub store_id: String,
    pub direction: CashDirection,
    /// Always positive; `direction` carries the sign.
    pub amount: Money,
    pub reason: CashReason,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    /// `previous ± amount == new` and `new >= 0`.
    pub fn is_consistent(&self) -> bool {
        self.amount.is_positive()
            && self.previous_balance.checked_add(self.direction.signed(self.amount))
                == Some(self.new_balance)
            && !self.new_balance.is_negative()
    }
}

/// A stock movement to apply, before it has been locked and numbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockMovement {
    pub product_id: String,
    pub store_id: String,
    pub quantity_change: i64,
    pub reason: StockReason,
    /// Overrides the type derived from the sign (used for ADJUSTMENT).
    pub movement_type: Option<MovementType>,
    pub reference_id: Option<String>,
    pub description: Option<String>,
}

impl NewStockMovement {
    pub fn new(
        product_id: impl Into<String>,
        store_id: impl Into<String>,
        quantity_change: i64,
        reason: StockReason,
    ) -> Self {
        NewStockMovement {
            product_id: product_id.into(),
            store_id: store_id.into(),
            quantity_change,
            reason,
            movement_type: None,
            reference_id: None,
            description: None,
        }
    }

    pub fn reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn movement_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    /// Explicit type if given, else derived from the sign of the change.
    pub fn resolved_type(&self) -> MovementType {
        self.movement_type
            .unwrap_or_else(|| MovementType::from_change(self.quantity_change))
    }
}

/// A cash movement to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCashMovement {
    pub store_id: String,
    pub direction: CashDirection,
    pub amount: Money,
    pub reason: CashReason,
    pub reference_id: Option<String>,
    pub description: Option<String>,
}

impl NewCashMovement {
    pub fn new(
        store_id: impl Into<String>,
        direction: CashDirection,
        amount: Money,
        reason: CashReason,
    ) -> Self {
        NewCashMovement {
            store_id: store_id.into(),
            direction,
            amount,
            reason,
            reference_id: None,
            description: None,
        }
    }

    pub fn reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// What a product is, for menus and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductNature {
    RawMaterial,
    #[default]
    FinishedGood,
    Service,
}

/// A product as the ledger sees it.
///
/// Prices are current prices. Sale items freeze their own copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub nature: ProductNature,
    /// Base units in one purchase unit (bottles per box).
    pub units_per_box: i64,
    /// Price of one purchase unit.
    pub purchase_price: Money,
    /// Price of one base unit.
    pub selling_price: Money,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Cost of one base unit at current purchase price.
    pub fn unit_cost(&self) -> Money {
        self.purchase_price.per_unit(self.units_per_box)
    }
}

/// One ingredient of a product's recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub component_product_id: String,
    /// Base units of the component consumed per unit sold.
    pub quantity_per_unit: Decimal,
}

impl RecipeEntry {
    pub fn new(component_product_id: impl Into<String>, quantity_per_unit: Decimal) -> Self {
        RecipeEntry {
            component_product_id: component_product_id.into(),
            quantity_per_unit,
        }
    }
}

// =============================================================================
// Workflow Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash, credited to the store's register.
    Cash,
    /// Paid by phone; no register movement.
    MobileMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[default]
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

/// Where an expense row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseKind {
    /// Recorded directly by the Expense workflow.
    #[default]
    General,
    /// Journal copy of a purchase's cash outflow.
    Purchase,
    /// Journal copy of a staff payment.
    Salary,
}

/// A sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub store_id: String,
    pub user_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze price and cost at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity in base units.
    pub quantity: i64,
    /// Selling price per unit at time of sale (frozen).
    pub unit_price: Money,
    pub sub_total: Money,
    /// Purchase cost per base unit at time of sale (frozen).
    pub unit_cost_snapshot: Money,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// (unit price − unit cost snapshot) × quantity, `None` on overflow.
    pub fn profit(&self) -> Option<Money> {
        self.unit_price
            .checked_sub(self.unit_cost_snapshot)?
            .checked_mul_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    pub store_id: String,
    pub supplier_id: Option<String>,
    pub user_id: Option<String>,
    pub status: PurchaseStatus,
    pub total_cost: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    /// Purchase units (boxes) bought.
    pub quantity_boxes: i64,
    /// Base units added to stock.
    pub quantity_units: i64,
    /// Price per box at time of purchase.
    pub unit_price_box: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: String,
    pub store_id: String,
    pub kind: ExpenseKind,
    pub description: String,
    pub amount: Money,
    /// Purchase or salary payment this row mirrors, if any.
    pub reference_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransfer {
    pub id: String,
    pub product_id: String,
    pub from_store_id: String,
    pub to_store_id: String,
    pub quantity: i64,
    pub user_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalaryPayment {
    pub id: String,
    /// Staff member being paid.
    pub user_id: String,
    pub store_id: String,
    pub amount: Money,
    /// Free-form pay period, e.g. "2026-09".
    pub period: String,
    /// Actor who paid.
    pub paid_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
