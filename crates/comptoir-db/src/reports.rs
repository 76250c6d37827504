//! # Reports
//!
//! Read-only aggregates over the ledgers and sale records. Nothing here
//! opens a unit of work.

use chrono::{Duration, NaiveDate, NaiveTime};
use comptoir_core::{DailySalesReport, GlobalCapital, Money, StockHealthEntry, StockPosition};
use sqlx::SqlitePool;
use tracing::debug;

use crate::catalog;
use crate::error::DbResult;
use crate::ledger::cash;
use crate::valuation;

#[derive(Debug, Clone)]
pub struct Reports {
    pool: SqlitePool,
    low_stock_threshold: i64,
}

impl Reports {
    pub fn new(pool: SqlitePool, low_stock_threshold: i64) -> Self {
        Reports {
            pool,
            low_stock_threshold,
        }
    }

    /// Revenue, profit and volume of the COMPLETED sales of one UTC day.
    ///
    /// Profit uses the unit cost frozen on each line, not today's cost.
    pub async fn daily_sales(
        &self,
        store_id: Option<&str>,
        date: NaiveDate,
    ) -> DbResult<DailySalesReport> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let (revenue, profit, transactions, items): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(si.sub_total), 0),
                COALESCE(SUM((si.unit_price - si.unit_cost_snapshot) * si.quantity), 0),
                COUNT(DISTINCT s.id),
                COALESCE(SUM(si.quantity), 0)
             FROM sales s
             JOIN sale_items si ON si.sale_id = s.id
             WHERE s.status = 'COMPLETED'
               AND s.created_at >= ?1 AND s.created_at < ?2
               AND (?3 IS NULL OR s.store_id = ?3)",
        )
        .bind(start)
        .bind(end)
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailySalesReport {
            date,
            store_id: store_id.map(str::to_string),
            total_revenue: Money::from_cents(revenue),
            total_profit: Money::from_cents(profit),
            transaction_count: transactions,
            items_sold: items,
        })
    }

    /// Every materialized position with its value and OUT/LOW/OK status.
    ///
    /// `threshold` falls back to the configured low-stock threshold.
    pub async fn stock_health(
        &self,
        store_id: Option<&str>,
        threshold: Option<i64>,
    ) -> DbResult<Vec<StockHealthEntry>> {
        let threshold = threshold.unwrap_or(self.low_stock_threshold);
        let mut conn = self.pool.acquire().await?;

        let positions = sqlx::query_as::<_, StockPosition>(
            "SELECT id, product_id, store_id, quantity, created_at, updated_at
             FROM stock_positions
             WHERE (?1 IS NULL OR store_id = ?1)
             ORDER BY store_id, product_id",
        )
        .bind(store_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut entries = Vec::with_capacity(positions.len());
        for position in positions {
            let product = catalog::require_product(&mut conn, &position.product_id).await?;
            entries.push(StockHealthEntry::new(
                &product,
                position.store_id,
                position.quantity,
                threshold,
            )?);
        }

        debug!(store_id, threshold, entries = entries.len(), "Stock health computed");
        Ok(entries)
    }

    /// Cash on hand plus stock at current cost.
    pub async fn global_capital(&self, store_id: Option<&str>) -> DbResult<GlobalCapital> {
        let mut conn = self.pool.acquire().await?;

        let liquid_assets = cash::read_balance(&mut conn, store_id).await?;
        let stock = valuation::current_valuation_in(&mut conn, store_id).await?;

        Ok(GlobalCapital::new(
            store_id.map(str::to_string),
            liquid_assets,
            stock.total_cost_value,
        )?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
