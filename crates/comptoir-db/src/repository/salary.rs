//! # Salary Payment Records
//!
//! One row per staff payment. The matching cash movement and SALARY expense
//! are written by the same unit of work.

use comptoir_core::SalaryPayment;
use sqlx::SqliteConnection;

use crate::error::DbResult;

const SALARY_COLUMNS: &str = "id, user_id, store_id, amount, period, paid_by, created_at";

pub async fn insert_salary_payment(
    conn: &mut SqliteConnection,
    payment: &SalaryPayment,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO salary_payments (
            id, user_id, store_id, amount, period, paid_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&payment.id)
    .bind(&payment.user_id)
    .bind(&payment.store_id)
    .bind(payment.amount)
    .bind(&payment.period)
    .bind(&payment.paid_by)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Payments made to one staff member, newest first.
pub async fn fetch_salary_payments(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> DbResult<Vec<SalaryPayment>> {
    let payments = sqlx::query_as::<_, SalaryPayment>(&format!(
        "SELECT {SALARY_COLUMNS} FROM salary_payments
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}
