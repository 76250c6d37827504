//! # Purchase Records
//!
//! Purchase headers and line items, written by the purchase workflow.

use comptoir_core::{Money, Purchase, PurchaseItem};
use sqlx::SqliteConnection;

use crate::error::DbResult;

const PURCHASE_COLUMNS: &str =
    "id, store_id, supplier_id, user_id, status, total_cost, notes, created_at";

const ITEM_COLUMNS: &str = "id, purchase_id, product_id, quantity_boxes, quantity_units, \
                            unit_price_box, total_price, created_at";

pub async fn insert_purchase(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO purchases (
            id, store_id, supplier_id, user_id, status, total_cost, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&purchase.id)
    .bind(&purchase.store_id)
    .bind(&purchase.supplier_id)
    .bind(&purchase.user_id)
    .bind(purchase.status)
    .bind(purchase.total_cost)
    .bind(&purchase.notes)
    .bind(purchase.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &PurchaseItem) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO purchase_items (
            id, purchase_id, product_id, quantity_boxes, quantity_units,
            unit_price_box, total_price, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&item.id)
    .bind(&item.purchase_id)
    .bind(&item.product_id)
    .bind(item.quantity_boxes)
    .bind(item.quantity_units)
    .bind(item.unit_price_box)
    .bind(item.total_price)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn set_total(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    total: Money,
) -> DbResult<()> {
    sqlx::query("UPDATE purchases SET total_cost = ?2 WHERE id = ?1")
        .bind(purchase_id)
        .bind(total)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn fetch_purchase(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
    let purchase = sqlx::query_as::<_, Purchase>(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(purchase)
}

pub async fn fetch_items(
    conn: &mut SqliteConnection,
    purchase_id: &str,
) -> DbResult<Vec<PurchaseItem>> {
    let items = sqlx::query_as::<_, PurchaseItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid"
    ))
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}
