//! Shared fixtures for the unit tests of this crate.

use comptoir_core::{
    Money, NewProduct, NewStockMovement, Product, ProductNature, RecipeEntry, StockReason,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::{Database, DbConfig};

/// Fresh in-memory database with migrations applied.
///
/// One connection only: commit before reading through the pool.
pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// File-backed database with several connections, for concurrency tests.
///
/// Returns the path so the test can remove the file afterwards.
pub async fn file_db(max_connections: u32) -> (Database, PathBuf) {
    file_db_with_lock_timeout(max_connections, Duration::from_secs(10)).await
}

pub async fn file_db_with_lock_timeout(
    max_connections: u32,
    lock_timeout: Duration,
) -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("comptoir-test-{}.db", uuid::Uuid::new_v4()));
    let config = DbConfig::new(&path)
        .max_connections(max_connections)
        .lock_timeout(lock_timeout);
    let db = Database::new(config).await.expect("file database");
    (db, path)
}

/// Removes a database created by [`file_db`] with its WAL side files.
pub fn remove_db_files(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

/// Inserts a finished good priced in major units (box price, unit price).
pub async fn seed_product(
    db: &Database,
    id: &str,
    units_per_box: i64,
    purchase_major: i64,
    selling_major: i64,
) -> Product {
    db.catalog()
        .insert_product(
            NewProduct::new(
                id,
                units_per_box,
                Money::from_major(purchase_major),
                Money::from_major(selling_major),
            )
            .with_id(id),
        )
        .await
        .expect("seed product")
}

/// Rum, mint and lime as raw materials plus a mojito made of
/// 0.05 rum, 2 mint and 0.5 lime per glass.
pub async fn seed_mojito(db: &Database) {
    for (id, units_per_box, purchase, selling) in [
        ("rum", 1, 12_000, 0),
        ("mint", 100, 1_000, 0),
        ("lime", 50, 5_000, 0),
    ] {
        db.catalog()
            .insert_product(
                NewProduct::new(
                    id,
                    units_per_box,
                    Money::from_major(purchase),
                    Money::from_major(selling),
                )
                .with_id(id)
                .nature(ProductNature::RawMaterial),
            )
            .await
            .expect("seed component");
    }

    seed_product(db, "mojito", 1, 0, 3_000).await;

    db.catalog()
        .set_recipe(
            "mojito",
            &[
                RecipeEntry::new("rum", dec("0.05")),
                RecipeEntry::new("mint", dec("2")),
                RecipeEntry::new("lime", dec("0.5")),
            ],
        )
        .await
        .expect("seed recipe");
}

/// Puts `quantity` units of a product in a store in its own unit of work.
pub async fn stock_in(db: &Database, product_id: &str, store_id: &str, quantity: i64) {
    let mut uow = db.begin().await.expect("begin");
    db.stock()
        .apply_movement(
            &mut uow,
            NewStockMovement::new(product_id, store_id, quantity, StockReason::Initial),
        )
        .await
        .expect("stock in");
    uow.commit().await.expect("commit");
}

/// Sets a store's register to `major` whole units.
pub async fn cash_in(db: &Database, store_id: &str, major: i64) {
    db.cash()
        .initialize_balance(store_id, Money::from_major(major), None)
        .await
        .expect("cash in");
}
