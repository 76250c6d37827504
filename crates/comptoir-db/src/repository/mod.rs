//! # Workflow Records
//!
//! The business documents each workflow writes next to its ledger
//! movements.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (inside a unit of work)                                  │
//! │       │                                                                 │
//! │       │  sale::insert_sale(conn, &sale)                                │
//! │       │  expense::insert_expense(conn, &expense)                       │
//! │       ▼                                                                 │
//! │  sales / sale_items / purchases / purchase_items                       │
//! │  expenses / stock_transfers / salary_payments                          │
//! │       ▲                                                                 │
//! │       │  db.records().get_sale(id)                                     │
//! │  Records (pool, read-only)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The insert functions take a connection and never commit; only the
//! orchestrator decides when a record becomes visible.

pub mod expense;
pub mod purchase;
pub mod salary;
pub mod sale;
pub mod transfer;

use chrono::{DateTime, Utc};
use comptoir_core::{
    Expense, ExpenseKind, RecordedPurchase, RecordedSale, SalaryPayment, StockTransfer,
};
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Read access to committed workflow records.
#[derive(Debug, Clone)]
pub struct Records {
    pool: SqlitePool,
}

impl Records {
    pub fn new(pool: SqlitePool) -> Self {
        Records { pool }
    }

    /// A sale with its line items.
    pub async fn get_sale(&self, id: &str) -> DbResult<Option<RecordedSale>> {
        let mut conn = self.pool.acquire().await?;

        let Some(sale) = sale::fetch_sale(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = sale::fetch_items(&mut conn, id).await?;

        Ok(Some(RecordedSale { sale, items }))
    }

    /// A purchase with its line items and expense journal row.
    pub async fn get_purchase(&self, id: &str) -> DbResult<Option<RecordedPurchase>> {
        let mut conn = self.pool.acquire().await?;

        let Some(purchase) = purchase::fetch_purchase(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = purchase::fetch_items(&mut conn, id).await?;
        let expense = expense::fetch_by_reference(&mut conn, ExpenseKind::Purchase, id).await?;

        Ok(Some(RecordedPurchase {
            purchase,
            items,
            expense,
        }))
    }

    /// Expenses of every kind with `from <= created_at <= to`.
    pub async fn expenses_between(
        &self,
        store_id: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        let mut conn = self.pool.acquire().await?;
        expense::fetch_between(&mut conn, store_id, from, to).await
    }

    pub async fn transfers(&self, product_id: &str) -> DbResult<Vec<StockTransfer>> {
        let mut conn = self.pool.acquire().await?;
        transfer::fetch_transfers(&mut conn, product_id).await
    }

    pub async fn salary_payments(&self, user_id: &str) -> DbResult<Vec<SalaryPayment>> {
        let mut conn = self.pool.acquire().await?;
        salary::fetch_salary_payments(&mut conn, user_id).await
    }
}
