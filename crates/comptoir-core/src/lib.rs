//! # comptoir-core: Pure Ledger Domain for Comptoir
//!
//! This crate holds the domain model of the ledger engine as plain data and
//! pure functions. Nothing here touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (HTTP controllers, CLI, jobs)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    comptoir-db (ledger engine)                  │   │
//! │  │   UnitOfWork, StockLedger, CashLedger, Orchestrator, Valuation  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ comptoir-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │ composition │  │ validation│ │   │
//! │  │   │ positions │  │   Money   │  │   expand    │  │   rules   │ │   │
//! │  │   │ movements │  │  per_unit │  │             │  │           │ │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘  └───────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Positions, movements and workflow records
//! - [`request`] - Workflow inputs and the records they return
//! - [`report`] - Valuation, stock health and sales report shapes
//! - [`money`] - Money type with integer arithmetic (minor units)
//! - [`composition`] - Recipe expansion of a sold product into components
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input rules checked before any ledger write
//!
//! ## Example Usage
//!
//! ```rust
//! use comptoir_core::money::Money;
//!
//! // A box of 24 bottles bought for 24 000.00
//! let box_price = Money::from_cents(2_400_000);
//! let unit_cost = box_price.per_unit(24);
//! assert_eq!(unit_cost.cents(), 100_000);
//! ```

pub mod composition;
pub mod error;
pub mod money;
pub mod report;
pub mod request;
pub mod types;
pub mod validation;

pub use composition::{expand, Consumption};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::*;
pub use request::*;
pub use types::*;

/// Maximum number of line items accepted in one sale or purchase.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line item, in base units (sales) or boxes
/// (purchases).
///
/// Guards against a mistyped 10000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Number of movements returned by a history query when the caller gives
/// no limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Quantity at or below which a position is reported as LOW.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
