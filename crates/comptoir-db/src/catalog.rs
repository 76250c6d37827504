//! # Catalog & Composition Resolver
//!
//! Read-mostly access to products and their recipes, and the recipe-backed
//! half of composition expansion.
//!
//! ```text
//!   Orchestrator (inside a unit of work)
//!        │
//!        │  resolve(conn, "mojito", 3)
//!        ▼
//!   fetch_recipe(conn, "mojito")  ──►  [(rum, 0.05), (mint, 2), (lime, 0.5)]
//!        │
//!        ▼
//!   comptoir_core::expand(...)    ──►  [(rum, 1), (mint, 6), (lime, 2)]
//! ```
//!
//! The `fetch_*` functions take a connection so workflows read through their
//! own transaction. [`Catalog`] wraps them for callers outside a unit of work.

use chrono::Utc;
use comptoir_core::validation::validate_quantity_per_unit;
use comptoir_core::{
    expand, Consumption, CoreError, NewProduct, Product, RecipeEntry, ValidationError,
};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, nature, units_per_box, purchase_price, selling_price, \
                               is_active, created_at, updated_at";

// =============================================================================
// Connection-level lookups
// =============================================================================

pub async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Like [`fetch_product`] but a missing product is `ProductNotFound`.
pub async fn require_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    fetch_product(conn, id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

/// Recipe entries in definition order. Empty when the product has none.
pub async fn fetch_recipe(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<RecipeEntry>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT component_product_id, quantity_per_unit
         FROM product_recipes
         WHERE product_id = ?1
         ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(component, qpu)| -> DbResult<RecipeEntry> {
            let quantity_per_unit = qpu.parse::<Decimal>().map_err(|e| {
                DbError::Decode(format!(
                    "recipe {product_id}/{component}: quantity_per_unit '{qpu}': {e}"
                ))
            })?;
            Ok(RecipeEntry::new(component, quantity_per_unit))
        })
        .collect()
}

/// Composition expansion of `quantity_sold` units of `product_id`.
pub async fn resolve(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity_sold: i64,
) -> DbResult<Vec<Consumption>> {
    let recipe = fetch_recipe(conn, product_id).await?;
    let consumption = expand(product_id, quantity_sold, &recipe)?;

    if !recipe.is_empty() {
        debug!(
            product_id,
            quantity_sold,
            components = consumption.len(),
            "Expanded recipe"
        );
    }

    Ok(consumption)
}

// =============================================================================
// Catalog
// =============================================================================

/// Pool-level catalog access.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub fn new(pool: SqlitePool) -> Self {
        Catalog { pool }
    }

    pub async fn insert_product(&self, new: NewProduct) -> DbResult<Product> {
        new.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new.name.trim().to_string(),
            nature: new.nature,
            units_per_box: new.units_per_box,
            purchase_price: new.purchase_price,
            selling_price: new.selling_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, name, nature, units_per_box, purchase_price, selling_price,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.nature)
        .bind(product.units_per_box)
        .bind(product.purchase_price)
        .bind(product.selling_price)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Soft-deletes a product. Its positions and history stay.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Replaces a product's recipe. An empty slice makes it consume itself.
    ///
    /// ## Rules
    /// - Every quantity per unit is positive
    /// - A product is not a component of itself
    /// - A component appears once
    /// - Every component exists
    pub async fn set_recipe(&self, product_id: &str, entries: &[RecipeEntry]) -> DbResult<()> {
        let mut seen = HashSet::new();
        for entry in entries {
            validate_quantity_per_unit(entry.quantity_per_unit)?;

            if entry.component_product_id == product_id {
                return Err(ValidationError::InvalidFormat {
                    field: "component_product_id".to_string(),
                    reason: "a product cannot be its own component".to_string(),
                }
                .into());
            }

            if !seen.insert(entry.component_product_id.as_str()) {
                return Err(ValidationError::InvalidFormat {
                    field: "component_product_id".to_string(),
                    reason: format!("{} listed twice", entry.component_product_id),
                }
                .into());
            }
        }

        let mut tx = self.pool.begin().await?;

        require_product(&mut tx, product_id).await?;
        for entry in entries {
            require_product(&mut tx, &entry.component_product_id).await?;
        }

        sqlx::query("DELETE FROM product_recipes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO product_recipes (product_id, position, component_product_id, quantity_per_unit)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(product_id)
            .bind(position as i64)
            .bind(&entry.component_product_id)
            .bind(entry.quantity_per_unit.normalize().to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(product_id, components = entries.len(), "Recipe replaced");
        Ok(())
    }

    pub async fn recipe(&self, product_id: &str) -> DbResult<Vec<RecipeEntry>> {
        let mut conn = self.pool.acquire().await?;
        fetch_recipe(&mut conn, product_id).await
    }

    /// Composition expansion outside a unit of work.
    pub async fn expand(&self, product_id: &str, quantity_sold: i64) -> DbResult<Vec<Consumption>> {
        let mut conn = self.pool.acquire().await?;
        resolve(&mut conn, product_id, quantity_sold).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
