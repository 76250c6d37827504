//! # Valuation Reconstructor
//!
//! Historical quantities and stock value rebuilt from the movement log.
//!
//! ## As-Of Lookup
//! ```text
//!   position (heineken@bar) created 09:00
//!
//!   movements      09:00 +24 → 24    12:30 −2 → 22    18:00 −5 → 17
//!                     │                 │                 │
//!   as_of 08:00  ─────┼─────────────────┼─────────────────┼──►  None (did not exist)
//!   as_of 10:00  ─────●─────────────────┼─────────────────┼──►  24
//!   as_of 15:00  ───────────────────────●─────────────────┼──►  22
//!   as_of 23:59  ─────────────────────────────────────────●──►  17
//! ```
//!
//! Only the per-key order of movements is used; nothing here assumes an
//! order between different keys. Prices are always the product's current
//! ones.

use chrono::{DateTime, Utc};
use comptoir_core::{ProductValuation, StockValuation};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::catalog;
use crate::error::DbResult;

/// Latest `new_quantity` at or before `?` for one position, 0 without one.
const QUANTITY_AS_OF: &str = "COALESCE((
        SELECT m.new_quantity FROM stock_movements m
        WHERE m.stock_position_id = p.id AND m.created_at <= ?1
        ORDER BY m.created_at DESC, m.entry_no DESC
        LIMIT 1
    ), 0)";

#[derive(Debug, Clone)]
pub struct Valuation {
    pool: SqlitePool,
}

impl Valuation {
    pub fn new(pool: SqlitePool) -> Self {
        Valuation { pool }
    }

    /// Quantity of a product in a store at `as_of`.
    ///
    /// `None` when the position did not exist yet at that time, which is
    /// not the same as holding zero.
    pub async fn quantity_as_of(
        &self,
        product_id: &str,
        store_id: &str,
        as_of: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        let row: Option<(DateTime<Utc>, i64)> = sqlx::query_as(&format!(
            "SELECT p.created_at, {QUANTITY_AS_OF}
             FROM stock_positions p
             WHERE p.product_id = ?2 AND p.store_id = ?3"
        ))
        .bind(as_of)
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .filter(|(created_at, _)| *created_at <= as_of)
            .map(|(_, quantity)| quantity))
    }

    /// Stock value at `as_of`, for one store or summed over every store.
    ///
    /// Positions created after `as_of` are left out.
    pub async fn valuation_as_of(
        &self,
        store_id: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> DbResult<StockValuation> {
        let quantities: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT p.product_id, SUM({QUANTITY_AS_OF})
             FROM stock_positions p
             WHERE p.created_at <= ?1 AND (?2 IS NULL OR p.store_id = ?2)
             GROUP BY p.product_id
             ORDER BY p.product_id"
        ))
        .bind(as_of)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let per_product = price(&mut conn, quantities).await?;

        debug!(store_id, %as_of, products = per_product.len(), "Reconstructed valuation");
        Ok(StockValuation::from_products(
            store_id.map(str::to_string),
            Some(as_of),
            per_product,
        )?)
    }

    /// Stock value of the live positions.
    pub async fn current_valuation(&self, store_id: Option<&str>) -> DbResult<StockValuation> {
        let mut conn = self.pool.acquire().await?;
        current_valuation_in(&mut conn, store_id).await
    }
}

pub(crate) async fn current_valuation_in(
    conn: &mut SqliteConnection,
    store_id: Option<&str>,
) -> DbResult<StockValuation> {
    let quantities: Vec<(String, i64)> = sqlx::query_as(
        "SELECT product_id, SUM(quantity)
         FROM stock_positions
         WHERE (?1 IS NULL OR store_id = ?1)
         GROUP BY product_id
         ORDER BY product_id",
    )
    .bind(store_id)
    .fetch_all(&mut *conn)
    .await?;

    let per_product = price(conn, quantities).await?;
    Ok(StockValuation::from_products(
        store_id.map(str::to_string),
        None,
        per_product,
    )?)
}

/// Prices each (product, quantity) at the product's current cost and price.
async fn price(
    conn: &mut SqliteConnection,
    quantities: Vec<(String, i64)>,
) -> DbResult<Vec<ProductValuation>> {
    let mut per_product = Vec::with_capacity(quantities.len());
    for (product_id, quantity) in quantities {
        let product = catalog::require_product(conn, &product_id).await?;
        per_product.push(ProductValuation::new(&product, quantity)?);
    }
    Ok(per_product)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, seed_product, stock_in};
    use comptoir_core::{Money, NewProduct, PaymentMethod, SaleLine, SaleRequest};
    use std::time::Duration;

    async fn tick() -> DateTime<Utc> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let now = Utc::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        now
    }

    async fn sell(db: &crate::pool::Database, store_id: &str, product_id: &str, quantity: i64) {
        db.orchestrator()
            .sale(SaleRequest {
                store_id: store_id.into(),
                items: vec![SaleLine::new(product_id, quantity)],
                payment_method: PaymentMethod::MobileMoney,
                actor_id: None,
                notes: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_quantity_as_of_follows_history() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let before = tick().await;
        stock_in(&db, "heineken", "bar", 24).await;
        let after_purchase = tick().await;
        sell(&db, "bar", "heineken", 2).await;
        let after_sale = tick().await;
        sell(&db, "bar", "heineken", 5).await;

        let valuation = db.valuation();
        assert_eq!(valuation.quantity_as_of("heineken", "bar", before).await.unwrap(), None);
        assert_eq!(
            valuation.quantity_as_of("heineken", "bar", after_purchase).await.unwrap(),
            Some(24)
        );
        assert_eq!(
            valuation.quantity_as_of("heineken", "bar", after_sale).await.unwrap(),
            Some(22)
        );
        assert_eq!(
            valuation.quantity_as_of("heineken", "bar", Utc::now()).await.unwrap(),
            Some(17)
        );
        assert_eq!(
            valuation.quantity_as_of("heineken", "terrace", Utc::now()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_valuation_as_of_excludes_later_positions() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        seed_product(&db, "coke", 12, 6_000, 700).await;

        stock_in(&db, "heineken", "bar", 24).await;
        let cutoff = tick().await;
        stock_in(&db, "coke", "bar", 12).await;
        sell(&db, "bar", "heineken", 4).await;

        let past = db.valuation().valuation_as_of(Some("bar"), cutoff).await.unwrap();
        assert_eq!(past.per_product.len(), 1);
        assert_eq!(past.per_product[0].product_id, "heineken");
        assert_eq!(past.per_product[0].quantity, 24);
        assert_eq!(past.total_cost_value, Money::from_major(24_000));
        assert_eq!(past.total_potential_revenue, Money::from_major(36_000));
        assert_eq!(past.as_of, Some(cutoff));

        let now = db.valuation().current_valuation(Some("bar")).await.unwrap();
        assert_eq!(now.per_product.len(), 2);
        // heineken 20 × 1 000 + coke 12 × 500
        assert_eq!(now.total_cost_value, Money::from_major(26_000));
    }

    #[tokio::test]
    async fn test_valuation_sums_stores_and_uses_current_prices() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "bar", 10).await;
        stock_in(&db, "heineken", "cellar", 14).await;
        let cutoff = tick().await;

        // A price change after the cutoff still applies to the past quantity.
        sqlx::query("UPDATE products SET purchase_price = ?1 WHERE id = 'heineken'")
            .bind(Money::from_major(48_000))
            .execute(db.pool())
            .await
            .unwrap();

        let all = db.valuation().valuation_as_of(None, cutoff).await.unwrap();
        assert_eq!(all.per_product[0].quantity, 24);
        assert_eq!(all.total_cost_value, Money::from_major(48_000));
        assert!(all.store_id.is_none());
    }

    #[tokio::test]
    async fn test_empty_catalog_values_to_zero() {
        let db = memory_db().await;
        db.catalog()
            .insert_product(NewProduct::new(
                "Water",
                6,
                Money::from_major(1_200),
                Money::from_major(300),
            ))
            .await
            .unwrap();

        let valuation = db.valuation().current_valuation(None).await.unwrap();
        assert!(valuation.per_product.is_empty());
        assert_eq!(valuation.total_cost_value, Money::zero());
    }
}
