//! # Expense Journal
//!
//! Every cash outflow that is not a refund lands here: general expenses,
//! purchase costs and staff payments. `kind` tells them apart.

use chrono::{DateTime, Utc};
use comptoir_core::{Expense, ExpenseKind};
use sqlx::SqliteConnection;

use crate::error::DbResult;

const EXPENSE_COLUMNS: &str =
    "id, store_id, kind, description, amount, reference_id, user_id, created_at";

pub async fn insert_expense(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO expenses (
            id, store_id, kind, description, amount, reference_id, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&expense.id)
    .bind(&expense.store_id)
    .bind(expense.kind)
    .bind(&expense.description)
    .bind(expense.amount)
    .bind(&expense.reference_id)
    .bind(&expense.user_id)
    .bind(expense.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// The journal row mirroring a purchase or salary payment.
pub async fn fetch_by_reference(
    conn: &mut SqliteConnection,
    kind: ExpenseKind,
    reference_id: &str,
) -> DbResult<Option<Expense>> {
    let expense = sqlx::query_as::<_, Expense>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE kind = ?1 AND reference_id = ?2"
    ))
    .bind(kind)
    .bind(reference_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(expense)
}

/// Expenses with `from <= created_at <= to`, oldest first.
pub async fn fetch_between(
    conn: &mut SqliteConnection,
    store_id: Option<&str>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<Expense>> {
    let expenses = sqlx::query_as::<_, Expense>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses
         WHERE (?1 IS NULL OR store_id = ?1) AND created_at >= ?2 AND created_at <= ?3
         ORDER BY created_at, rowid"
    ))
    .bind(store_id)
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    Ok(expenses)
}
