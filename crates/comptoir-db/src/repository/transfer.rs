//! # Stock Transfer Records

use comptoir_core::StockTransfer;
use sqlx::SqliteConnection;

use crate::error::DbResult;

const TRANSFER_COLUMNS: &str =
    "id, product_id, from_store_id, to_store_id, quantity, user_id, notes, created_at";

pub async fn insert_transfer(
    conn: &mut SqliteConnection,
    transfer: &StockTransfer,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO stock_transfers (
            id, product_id, from_store_id, to_store_id, quantity, user_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&transfer.id)
    .bind(&transfer.product_id)
    .bind(&transfer.from_store_id)
    .bind(&transfer.to_store_id)
    .bind(transfer.quantity)
    .bind(&transfer.user_id)
    .bind(&transfer.notes)
    .bind(transfer.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Transfers of a product in or out of any store, newest first.
pub async fn fetch_transfers(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<StockTransfer>> {
    let transfers = sqlx::query_as::<_, StockTransfer>(&format!(
        "SELECT {TRANSFER_COLUMNS} FROM stock_transfers
         WHERE product_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(transfers)
}
