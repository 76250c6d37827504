//! # Cash Ledger
//!
//! One balance per store in minor units, never below zero. Every change is
//! a signed movement with a direction and a positive amount.

use chrono::{DateTime, Utc};
use comptoir_core::validation::{validate_amount, validate_store_id};
use comptoir_core::{
    CashDirection, CashMovement, CashPosition, CashReason, CoreError, Money, NewCashMovement,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::unit_of_work::UnitOfWork;

const POSITION_COLUMNS: &str = "id, store_id, balance, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, entry_no, batch_no, cash_position_id, store_id, direction, \
     amount, reason, previous_balance, new_balance, reference_id, description, created_at";

// =============================================================================
// Write path
// =============================================================================

/// Applies one cash movement inside `uow`.
///
/// `amount` must be positive; the direction carries the sign. An OUT larger
/// than the balance fails with `InsufficientCash` and writes nothing.
pub async fn apply_movement(
    uow: &mut UnitOfWork,
    movement: NewCashMovement,
) -> DbResult<CashPosition> {
    validate_store_id(&movement.store_id)?;
    validate_amount(movement.amount)?;

    let batch_no = uow.batch_no();
    let conn = uow.conn()?;

    let position = lock_position(conn, &movement.store_id).await?;
    let previous = position.balance;

    let new_balance = previous
        .checked_add(movement.direction.signed(movement.amount))
        .ok_or_else(|| {
            CoreError::invalid_amount(format!("balance overflow: {previous} + {}", movement.amount))
        })?;

    if new_balance.is_negative() {
        warn!(
            store_id = %movement.store_id,
            available = %previous,
            requested = %movement.amount,
            "Rejected cash movement"
        );
        return Err(CoreError::InsufficientCash {
            store_id: movement.store_id,
            available: previous,
            requested: movement.amount,
        }
        .into());
    }

    let position_id = position
        .id
        .clone()
        .ok_or_else(|| DbError::Internal("locked cash position has no id".into()))?;
    let now = Utc::now();

    sqlx::query("UPDATE cash_positions SET balance = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(&position_id)
        .bind(new_balance)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO cash_movements (
            id, batch_no, cash_position_id, store_id, direction, amount, reason,
            previous_balance, new_balance, reference_id, description, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(batch_no)
    .bind(&position_id)
    .bind(&movement.store_id)
    .bind(movement.direction)
    .bind(movement.amount)
    .bind(movement.reason)
    .bind(previous)
    .bind(new_balance)
    .bind(&movement.reference_id)
    .bind(&movement.description)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        store_id = %movement.store_id,
        direction = ?movement.direction,
        reason = ?movement.reason,
        previous = %previous,
        new = %new_balance,
        batch_no,
        "Cash movement applied"
    );

    Ok(CashPosition {
        balance: new_balance,
        updated_at: Some(now),
        ..position
    })
}

async fn lock_position(conn: &mut SqliteConnection, store_id: &str) -> DbResult<CashPosition> {
    if let Some(position) = select_position(conn, store_id).await? {
        return Ok(position);
    }

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO cash_positions (id, store_id, balance, created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?3)
         ON CONFLICT (store_id) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(store_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(store_id, "Cash position created");

    select_position(conn, store_id)
        .await?
        .ok_or_else(|| DbError::not_found("CashPosition", store_id))
}

async fn select_position(
    conn: &mut SqliteConnection,
    store_id: &str,
) -> DbResult<Option<CashPosition>> {
    let position = sqlx::query_as::<_, CashPosition>(&format!(
        "SELECT {POSITION_COLUMNS} FROM cash_positions WHERE store_id = ?1"
    ))
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(position)
}

pub(crate) async fn read_position(
    conn: &mut SqliteConnection,
    store_id: &str,
) -> DbResult<CashPosition> {
    Ok(select_position(conn, store_id)
        .await?
        .unwrap_or_else(|| CashPosition::unmaterialized(store_id)))
}

/// Balance of one store, or of every store summed.
pub(crate) async fn read_balance(
    conn: &mut SqliteConnection,
    store_id: Option<&str>,
) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(balance), 0) FROM cash_positions WHERE (?1 IS NULL OR store_id = ?1)",
    )
    .bind(store_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_cents(cents))
}

// =============================================================================
// Cash Ledger
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashLedger {
    pool: SqlitePool,
    history_limit: i64,
}

impl CashLedger {
    pub fn new(pool: SqlitePool, history_limit: i64) -> Self {
        CashLedger {
            pool,
            history_limit,
        }
    }

    /// See [`apply_movement`].
    pub async fn apply_movement(
        &self,
        uow: &mut UnitOfWork,
        movement: NewCashMovement,
    ) -> DbResult<CashPosition> {
        apply_movement(uow, movement).await
    }

    /// Current register. A store never written reads as zero.
    pub async fn position(&self, store_id: &str) -> DbResult<CashPosition> {
        validate_store_id(store_id)?;
        let mut conn = self.pool.acquire().await?;
        read_position(&mut conn, store_id).await
    }

    /// Balance of one store, or the sum over all stores when `None`.
    pub async fn balance(&self, store_id: Option<&str>) -> DbResult<Money> {
        if let Some(store_id) = store_id {
            validate_store_id(store_id)?;
        }
        let mut conn = self.pool.acquire().await?;
        read_balance(&mut conn, store_id).await
    }

    /// Sets a store's balance to `target` with one OPENING_BALANCE movement
    /// for the difference.
    ///
    /// Writes nothing when the balance already equals `target`.
    pub async fn initialize_balance(
        &self,
        store_id: &str,
        target: Money,
        actor_id: Option<&str>,
    ) -> DbResult<CashPosition> {
        validate_store_id(store_id)?;
        if target.is_negative() {
            return Err(CoreError::invalid_amount(format!(
                "opening balance cannot be negative, got {target}"
            ))
            .into());
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match initialize_in(&mut uow, store_id, target, actor_id).await {
            Ok(Some(position)) => {
                uow.commit().await?;
                info!(store_id, balance = %position.balance, "Cash balance initialized");
                Ok(position)
            }
            Ok(None) => {
                let current = read_position(uow.conn()?, store_id).await;
                uow.rollback().await?;
                debug!(store_id, "Cash balance already at target");
                current
            }
            Err(err) => uow.abort(err).await,
        }
    }

    /// Movements of a store, newest first.
    pub async fn history(&self, store_id: &str, limit: Option<i64>) -> DbResult<Vec<CashMovement>> {
        let limit = limit.unwrap_or(self.history_limit).max(1);

        let movements = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements
             WHERE store_id = ?1
             ORDER BY created_at DESC, entry_no DESC
             LIMIT ?2"
        ))
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements with `from <= created_at <= to`, newest first.
    pub async fn movements_between(
        &self,
        store_id: Option<&str>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements
             WHERE (?1 IS NULL OR store_id = ?1) AND created_at >= ?2 AND created_at <= ?3
             ORDER BY created_at DESC, entry_no DESC"
        ))
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements written for a sale, purchase, expense or staff payment.
    pub async fn movements_for_reference(&self, reference_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements
             WHERE reference_id = ?1
             ORDER BY entry_no"
        ))
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Writes the OPENING_BALANCE difference, or returns `None` when there is
/// none to write.
async fn initialize_in(
    uow: &mut UnitOfWork,
    store_id: &str,
    target: Money,
    actor_id: Option<&str>,
) -> DbResult<Option<CashPosition>> {
    let current = read_position(uow.conn()?, store_id).await?;
    let difference = target - current.balance;
    if difference.is_zero() {
        return Ok(None);
    }

    let direction = if difference.is_positive() {
        CashDirection::In
    } else {
        CashDirection::Out
    };
    let mut movement = NewCashMovement::new(
        store_id,
        direction,
        difference.abs(),
        CashReason::OpeningBalance,
    )
    .description("Opening balance");
    if let Some(actor) = actor_id {
        movement = movement.reference(actor);
    }

    apply_movement(uow, movement).await.map(Some)
}

// =============================================================================
// Unit Tests
// =============================================================================
