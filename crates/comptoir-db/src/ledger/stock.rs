//! # Stock Ledger
//!
//! Quantity per (product, store) in base units, never below zero.

use chrono::Utc;
use comptoir_core::validation::{validate_quantity_change, validate_store_id};
use comptoir_core::{
    CoreError, MovementType, NewStockMovement, StockAdjustment, StockMovement, StockPosition,
    StockReason, ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

const POSITION_COLUMNS: &str = "id, product_id, store_id, quantity, created_at, updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str = "id, entry_no, batch_no, stock_position_id, product_id, \
     store_id, movement_type, reason, quantity_change, previous_quantity, new_quantity, \
     reference_id, description, created_at";

// =============================================================================
// Write path
// =============================================================================

/// Applies one stock movement inside `uow`.
///
/// ## Steps
/// 1. Lock the (product, store) position, creating it at 0 if absent
/// 2. `new = previous + change`; reject below zero without writing
/// 3. Update the position and append one movement
///
/// The movement type is derived from the sign unless the caller set one.
pub async fn apply_movement(
    uow: &mut UnitOfWork,
    movement: NewStockMovement,
) -> DbResult<StockPosition> {
    validate_store_id(&movement.store_id)?;
    validate_quantity_change(movement.quantity_change)?;

    let batch_no = uow.batch_no();
    let conn = uow.conn()?;

    let position = lock_position(conn, &movement.product_id, &movement.store_id).await?;
    let previous = position.quantity;

    let new_quantity = previous
        .checked_add(movement.quantity_change)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity_change".to_string(),
            min: -previous,
            max: i64::MAX - previous,
        })?;

    if new_quantity < 0 {
        warn!(
            product_id = %movement.product_id,
            store_id = %movement.store_id,
            available = previous,
            requested = -movement.quantity_change,
            "Rejected stock movement"
        );
        return Err(CoreError::InsufficientStock {
            product_id: movement.product_id,
            store_id: movement.store_id,
            available: previous,
            requested: -movement.quantity_change,
        }
        .into());
    }

    let position_id = position
        .id
        .clone()
        .ok_or_else(|| DbError::Internal("locked position has no id".into()))?;
    let now = Utc::now();
    let movement_type = movement.resolved_type();

    sqlx::query("UPDATE stock_positions SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&position_id)
        .bind(new_quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO stock_movements (
            id, batch_no, stock_position_id, product_id, store_id,
            movement_type, reason, quantity_change, previous_quantity, new_quantity,
            reference_id, description, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(batch_no)
    .bind(&position_id)
    .bind(&movement.product_id)
    .bind(&movement.store_id)
    .bind(movement_type)
    .bind(movement.reason)
    .bind(movement.quantity_change)
    .bind(previous)
    .bind(new_quantity)
    .bind(&movement.reference_id)
    .bind(&movement.description)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %movement.product_id,
        store_id = %movement.store_id,
        reason = movement.reason.as_str(),
        previous,
        new = new_quantity,
        batch_no,
        "Stock movement applied"
    );

    Ok(StockPosition {
        quantity: new_quantity,
        updated_at: Some(now),
        ..position
    })
}

/// Returns the position row for the key, inserting it at 0 first if absent.
///
/// The caller's unit of work already holds the writer lock, so the row read
/// here cannot change until commit.
async fn lock_position(
    conn: &mut SqliteConnection,
    product_id: &str,
    store_id: &str,
) -> DbResult<StockPosition> {
    if let Some(position) = select_position(conn, product_id, store_id).await? {
        return Ok(position);
    }

    let product_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
    if !product_exists {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO stock_positions (id, product_id, store_id, quantity, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)
         ON CONFLICT (product_id, store_id) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(store_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(product_id, store_id, "Stock position created");

    select_position(conn, product_id, store_id)
        .await?
        .ok_or_else(|| DbError::not_found("StockPosition", format!("{product_id}@{store_id}")))
}

async fn select_position(
    conn: &mut SqliteConnection,
    product_id: &str,
    store_id: &str,
) -> DbResult<Option<StockPosition>> {
    let position = sqlx::query_as::<_, StockPosition>(&format!(
        "SELECT {POSITION_COLUMNS} FROM stock_positions WHERE product_id = ?1 AND store_id = ?2"
    ))
    .bind(product_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(position)
}

/// Current position read through a given connection; zero if never written.
pub(crate) async fn read_position(
    conn: &mut SqliteConnection,
    product_id: &str,
    store_id: &str,
) -> DbResult<StockPosition> {
    Ok(select_position(conn, product_id, store_id)
        .await?
        .unwrap_or_else(|| StockPosition::unmaterialized(product_id, store_id)))
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Stock ledger operations.
///
/// ```rust,ignore
/// let mut uow = db.begin().await?;
/// db.stock().apply_movement(&mut uow, NewStockMovement::new("heineken", "bar", 24, StockReason::Purchase)).await?;
/// uow.commit().await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    history_limit: i64,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, history_limit: i64) -> Self {
        StockLedger {
            pool,
            history_limit,
        }
    }

    /// See [`apply_movement`].
    pub async fn apply_movement(
        &self,
        uow: &mut UnitOfWork,
        movement: NewStockMovement,
    ) -> DbResult<StockPosition> {
        apply_movement(uow, movement).await
    }

    /// Current position. A key never written reads as quantity 0 and is not
    /// persisted.
    pub async fn position(&self, product_id: &str, store_id: &str) -> DbResult<StockPosition> {
        validate_store_id(store_id)?;
        let mut conn = self.pool.acquire().await?;
        read_position(&mut conn, product_id, store_id).await
    }

    /// Materialized positions, optionally for one store.
    pub async fn positions(&self, store_id: Option<&str>) -> DbResult<Vec<StockPosition>> {
        let positions = sqlx::query_as::<_, StockPosition>(&format!(
            "SELECT {POSITION_COLUMNS} FROM stock_positions
             WHERE (?1 IS NULL OR store_id = ?1)
             ORDER BY store_id, product_id"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(positions)
    }

    /// Sum of a product's quantity over every store.
    pub async fn total_quantity(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_positions WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Manual correction in its own unit of work.
    ///
    /// Reason ADJUSTMENT writes an ADJUSTMENT movement; LOSS, FREE and
    /// TRANSFER write IN or OUT by sign. The actor is kept as the movement's
    /// reference.
    pub async fn adjust(&self, adjustment: StockAdjustment) -> DbResult<StockPosition> {
        adjustment.validate()?;

        let mut movement = NewStockMovement::new(
            &adjustment.product_id,
            &adjustment.store_id,
            adjustment.delta,
            adjustment.reason,
        );
        if adjustment.reason == StockReason::Adjustment {
            movement = movement.movement_type(MovementType::Adjustment);
        }
        if let Some(actor) = &adjustment.actor_id {
            movement = movement.reference(actor);
        }
        if let Some(notes) = &adjustment.notes {
            movement = movement.description(notes);
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match apply_movement(&mut uow, movement).await {
            Ok(position) => {
                uow.commit().await?;
                info!(
                    product_id = %adjustment.product_id,
                    store_id = %adjustment.store_id,
                    delta = adjustment.delta,
                    reason = adjustment.reason.as_str(),
                    "Stock adjusted"
                );
                Ok(position)
            }
            Err(err) => uow.abort(err).await,
        }
    }

    /// Movements of a product, newest first.
    ///
    /// Without a store, movements from every store are interleaved by time.
    pub async fn history(
        &self,
        product_id: &str,
        store_id: Option<&str>,
        limit: Option<i64>,
    ) -> DbResult<Vec<StockMovement>> {
        let limit = limit.unwrap_or(self.history_limit).max(1);

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
             WHERE product_id = ?1 AND (?2 IS NULL OR store_id = ?2)
             ORDER BY created_at DESC, entry_no DESC
             LIMIT ?3"
        ))
        .bind(product_id)
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Every movement of one key in write order, oldest first.
    pub async fn journal(&self, product_id: &str, store_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
             WHERE product_id = ?1 AND store_id = ?2
             ORDER BY entry_no"
        ))
        .bind(product_id)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements written for a sale, purchase or transfer.
    pub async fn movements_for_reference(
        &self,
        reference_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
             WHERE reference_id = ?1
             ORDER BY entry_no"
        ))
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, seed_product, stock_in};

    fn purchase(qty: i64) -> NewStockMovement {
        NewStockMovement::new("heineken", "bar", qty, StockReason::Purchase)
    }

    #[tokio::test]
    async fn test_first_movement_creates_position() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        let position = db.stock().apply_movement(&mut uow, purchase(24)).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(position.quantity, 24);
        assert!(position.is_materialized());

        let history = db.stock().history("heineken", Some("bar"), None).await.unwrap();
        assert_eq!(history.len(), 1);
        let mv = &history[0];
        assert_eq!(mv.movement_type, MovementType::In);
        assert_eq!(mv.reason, StockReason::Purchase);
        assert_eq!((mv.previous_quantity, mv.quantity_change, mv.new_quantity), (0, 24, 24));
        assert_eq!(mv.batch_no, uow.batch_no());
        assert!(mv.is_consistent());
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected_without_writes() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        db.stock().apply_movement(&mut uow, purchase(22)).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let err = db
            .stock()
            .apply_movement(
                &mut uow,
                NewStockMovement::new("heineken", "bar", -30, StockReason::Sale),
            )
            .await
            .unwrap_err();
        uow.rollback().await.unwrap();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_id,
                store_id,
                available,
                requested,
            }) => {
                assert_eq!(product_id, "heineken");
                assert_eq!(store_id, "bar");
                assert_eq!(available, 22);
                assert_eq!(requested, 30);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 22);
        assert_eq!(db.stock().journal("heineken", "bar").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_movement_on_closed_unit_of_work() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        uow.commit().await.unwrap();

        let err = db.stock().apply_movement(&mut uow, purchase(1)).await.unwrap_err();
        assert!(matches!(err, DbError::NoActiveTransaction));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = memory_db().await;

        let mut uow = db.begin().await.unwrap();
        let err = db.stock().apply_movement(&mut uow, purchase(1)).await.unwrap_err();
        uow.rollback().await.unwrap();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(id)) if id == "heineken"));
    }

    #[tokio::test]
    async fn test_zero_change_is_rejected() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        let err = db.stock().apply_movement(&mut uow, purchase(0)).await.unwrap_err();
        uow.rollback().await.unwrap();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBeNonZero { .. }))
        ));
    }

    #[tokio::test]
    async fn test_position_read_is_idempotent_and_not_persisted() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let first = db.stock().position("heineken", "cellar").await.unwrap();
        let second = db.stock().position("heineken", "cellar").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.quantity, 0);
        assert!(!first.is_materialized());
        assert!(db.stock().positions(Some("cellar")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_store_id() {
        let db = memory_db().await;
        let err = db.stock().position("heineken", "").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MissingStoreId)));
    }

    #[tokio::test]
    async fn test_adjust_loss_and_correction() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        db.stock().apply_movement(&mut uow, purchase(24)).await.unwrap();
        uow.commit().await.unwrap();

        let position = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: -2,
                reason: StockReason::Loss,
                notes: Some("broken".into()),
                actor_id: Some("manager-1".into()),
            })
            .await
            .unwrap();
        assert_eq!(position.quantity, 22);

        let position = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: 1,
                reason: StockReason::Adjustment,
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap();
        assert_eq!(position.quantity, 23);

        let history = db.stock().history("heineken", Some("bar"), Some(2)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].movement_type, MovementType::Adjustment);
        assert_eq!(history[1].movement_type, MovementType::Out);
        assert_eq!(history[1].reason, StockReason::Loss);
        assert_eq!(history[1].reference_id.as_deref(), Some("manager-1"));
        assert_eq!(history[1].description.as_deref(), Some("broken"));
    }

    #[tokio::test]
    async fn test_adjust_below_zero_rolls_back() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let err = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: -1,
                reason: StockReason::Free,
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1, .. })
        ));
        // The zero row created while locking was rolled back with the rest.
        assert!(db.stock().positions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_rejects_sale_reason() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let err = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: -1,
                reason: StockReason::Sale,
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_adjust_rejects_unnegatable_delta() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "bar", 5).await;

        let err = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: i64::MIN,
                reason: StockReason::Loss,
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // The largest representable loss is still an ordinary overdraw.
        let err = db
            .stock()
            .adjust(StockAdjustment {
                product_id: "heineken".into(),
                store_id: "bar".into(),
                delta: -i64::MAX,
                reason: StockReason::Loss,
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 5, requested: i64::MAX, .. })
        ));
        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_history_respects_limit_and_order() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let mut uow = db.begin().await.unwrap();
        for qty in [1, 2, 3] {
            db.stock().apply_movement(&mut uow, purchase(qty)).await.unwrap();
        }
        uow.commit().await.unwrap();

        let history = db.stock().history("heineken", None, Some(2)).await.unwrap();
        let changes: Vec<_> = history.iter().map(|m| m.quantity_change).collect();
        assert_eq!(changes, vec![3, 2]);
    }
}
