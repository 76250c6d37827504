//! # comptoir-db: Ledger Engine for Comptoir
//!
//! Stock and cash ledgers for a multi-store bar, kept consistent on SQLite
//! through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Data Flow                               │
//! │                                                                         │
//! │  Caller (controller, CLI, job)                                         │
//! │       │  db.orchestrator().sale(request)                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   comptoir-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │ Orchestrator │──►│ StockLedger  │   │ Valuation        │   │   │
//! │  │   │ (workflow)   │──►│ CashLedger   │   │ Reports          │   │   │
//! │  │   │              │──►│ Catalog      │   │ (read-only)      │   │   │
//! │  │   └──────┬───────┘   └──────┬───────┘   └────────┬─────────┘   │   │
//! │  │          │   UnitOfWork     │                    │             │   │
//! │  │          ▼                  ▼                    ▼             │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │         Database (pool.rs) + embedded migrations        │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML + environment configuration
//! - [`unit_of_work`] - Transaction holding the writer lock
//! - [`ledger`] - Stock and cash ledgers
//! - [`catalog`] - Products, recipes and composition expansion
//! - [`workflow`] - Sale, purchase, expense, transfer, staff payment
//! - [`valuation`] - Point-in-time quantities and stock value
//! - [`reports`] - Daily sales, stock health, global capital
//! - [`repository`] - Workflow records (sales, purchases, expenses)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comptoir_db::{Database, LedgerConfig};
//!
//! let db = Database::open(&LedgerConfig::load(None)?).await?;
//!
//! db.cash().initialize_balance("bar", Money::from_major(50_000), None).await?;
//! let sale = db.orchestrator().sale(request).await?;
//! let value = db.valuation().valuation_as_of(Some("bar"), yesterday).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;
pub mod unit_of_work;
pub mod valuation;
pub mod workflow;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::Catalog;
pub use config::{LedgerConfig, LedgerSettings};
pub use error::{DbError, DbResult};
pub use ledger::{CashLedger, StockLedger};
pub use pool::{Database, DbConfig};
pub use reports::Reports;
pub use repository::Records;
pub use unit_of_work::UnitOfWork;
pub use valuation::Valuation;
pub use workflow::Orchestrator;
