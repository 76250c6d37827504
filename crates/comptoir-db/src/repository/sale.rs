//! # Sale Records
//!
//! Sale headers and line items. Written only by the sale workflow, inside
//! its unit of work.
//!
//! ```text
//!  insert_sale()       header, total 0
//!  insert_item() ×N    one row per request line, prices frozen
//!  set_total()         Σ sub_total once every line succeeded
//! ```

use comptoir_core::{Money, Sale, SaleItem};
use sqlx::SqliteConnection;

use crate::error::DbResult;

const SALE_COLUMNS: &str =
    "id, store_id, user_id, payment_method, status, total_amount, notes, created_at";

const ITEM_COLUMNS: &str =
    "id, sale_id, product_id, quantity, unit_price, sub_total, unit_cost_snapshot, created_at";

pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sales (
            id, store_id, user_id, payment_method, status, total_amount, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&sale.id)
    .bind(&sale.store_id)
    .bind(&sale.user_id)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(sale.total_amount)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_items (
            id, sale_id, product_id, quantity, unit_price, sub_total,
            unit_cost_snapshot, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.sub_total)
    .bind(item.unit_cost_snapshot)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn set_total(conn: &mut SqliteConnection, sale_id: &str, total: Money) -> DbResult<()> {
    sqlx::query("UPDATE sales SET total_amount = ?2 WHERE id = ?1")
        .bind(sale_id)
        .bind(total)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

/// Line items in insertion order.
pub async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}
