//! # Demo Ledger Seeder
//!
//! Populates a database with a small bar: a cellar, a bar counter and a
//! terrace, a few drinks, a cocktail recipe and a day of activity.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by the config (comptoir.db by default)
//! cargo run -p comptoir-db --bin seed
//!
//! # Specify database path or config file
//! cargo run -p comptoir-db --bin seed -- --db ./data/comptoir.db
//! cargo run -p comptoir-db --bin seed -- --config ./comptoir.toml
//! ```
//!
//! ## What Gets Written
//! - Products: beers, soft drinks, rum, mint, lime and a mojito recipe
//! - Opening cash in every store
//! - Purchases into the cellar, transfers to the bar and terrace
//! - Cash and mobile-money sales, one general expense, one salary
//!
//! Finishes by printing the global capital report as JSON.

use comptoir_core::{
    ExpenseRequest, Money, NewProduct, PaymentMethod, ProductNature, PurchaseLine,
    PurchaseRequest, RecipeEntry, SaleLine, SaleRequest, StaffPaymentRequest, TransferRequest,
};
use comptoir_db::{Database, LedgerConfig};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (id, name, nature, units per box, box price, unit price), major units.
const PRODUCTS: &[(&str, &str, ProductNature, i64, i64, i64)] = &[
    ("heineken", "Heineken 33cl", ProductNature::FinishedGood, 24, 24_000, 1_500),
    ("castel", "Castel 65cl", ProductNature::FinishedGood, 12, 9_600, 1_000),
    ("coke", "Coca-Cola 33cl", ProductNature::FinishedGood, 24, 9_600, 600),
    ("water", "Water 1.5L", ProductNature::FinishedGood, 6, 2_400, 700),
    ("rum", "White rum 70cl", ProductNature::RawMaterial, 6, 48_000, 0),
    ("mint", "Mint leaves", ProductNature::RawMaterial, 200, 2_000, 0),
    ("lime", "Lime", ProductNature::RawMaterial, 50, 5_000, 0),
    ("mojito", "Mojito", ProductNature::FinishedGood, 1, 0, 3_500),
];

const STORES: &[(&str, i64)] = &[("cellar", 200_000), ("bar", 50_000), ("terrace", 30_000)];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,comptoir=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Comptoir Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: database.path)");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = LedgerConfig::load(config_path)?.with_database_path(db_path);

    println!("Comptoir Demo Seeder");
    println!("====================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::open(&config).await?;

    let existing = db.catalog().list_active().await?.len();
    if existing > 0 {
        println!("Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    seed_catalog(&db).await?;
    println!("✓ {} products, 1 recipe", PRODUCTS.len());

    for (store_id, opening) in STORES {
        db.cash()
            .initialize_balance(store_id, Money::from_major(*opening), Some("owner"))
            .await?;
    }
    println!("✓ Opening cash in {} stores", STORES.len());

    seed_activity(&db).await?;
    println!("✓ Purchases, transfers, sales, expenses");

    let capital = db.reports().global_capital(None).await?;
    println!();
    println!("{}", serde_json::to_string_pretty(&capital)?);

    info!(global_capital = %capital.global_capital, "Seed complete");
    db.close().await;
    Ok(())
}

async fn seed_catalog(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    for (id, name, nature, units_per_box, box_price, unit_price) in PRODUCTS {
        db.catalog()
            .insert_product(
                NewProduct::new(
                    *name,
                    *units_per_box,
                    Money::from_major(*box_price),
                    Money::from_major(*unit_price),
                )
                .with_id(*id)
                .nature(*nature),
            )
            .await?;
    }

    // Quantities in base units: 0.05 bottle of rum, 8 leaves, half a lime.
    db.catalog()
        .set_recipe(
            "mojito",
            &[
                RecipeEntry::new("rum", Decimal::new(5, 2)),
                RecipeEntry::new("mint", Decimal::from(8)),
                RecipeEntry::new("lime", Decimal::new(5, 1)),
            ],
        )
        .await?;

    Ok(())
}

async fn seed_activity(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = db.orchestrator();

    let lines = vec![
        PurchaseLine::new("heineken", 3, Money::from_major(24_000)),
        PurchaseLine::new("castel", 2, Money::from_major(9_600)),
        PurchaseLine::new("coke", 2, Money::from_major(9_600)),
        PurchaseLine::new("water", 4, Money::from_major(2_400)),
        PurchaseLine::new("rum", 1, Money::from_major(48_000)),
        PurchaseLine::new("mint", 1, Money::from_major(2_000)),
        PurchaseLine::new("lime", 1, Money::from_major(5_000)),
    ];
    orchestrator
        .purchase(PurchaseRequest {
            store_id: "cellar".into(),
            supplier_id: Some("brasseries-du-centre".into()),
            items: lines,
            notes: Some("Weekly delivery".into()),
            actor_id: Some("owner".into()),
        })
        .await?;

    for (product_id, to_store_id, quantity) in [
        ("heineken", "bar", 36),
        ("heineken", "terrace", 24),
        ("castel", "bar", 12),
        ("coke", "bar", 24),
        ("water", "terrace", 12),
        ("rum", "bar", 3),
        ("mint", "bar", 120),
        ("lime", "bar", 30),
    ] {
        orchestrator
            .transfer(TransferRequest {
                product_id: product_id.into(),
                from_store_id: "cellar".into(),
                to_store_id: to_store_id.into(),
                quantity,
                actor_id: Some("owner".into()),
                notes: None,
            })
            .await?;
    }

    let sales = vec![
        sale("bar", vec![("heineken", 4), ("coke", 2)], PaymentMethod::Cash),
        sale("bar", vec![("mojito", 3)], PaymentMethod::Cash),
        sale("bar", vec![("castel", 6)], PaymentMethod::MobileMoney),
        sale("terrace", vec![("heineken", 6), ("water", 2)], PaymentMethod::Cash),
        // Rejected: the terrace has no mojito ingredients.
        sale("terrace", vec![("mojito", 1)], PaymentMethod::Cash),
    ];
    for (index, result) in orchestrator.record_sales_bulk(sales).await.into_iter().enumerate() {
        match result {
            Ok(sale_id) => info!(index, %sale_id, "Demo sale recorded"),
            Err(err) => info!(index, error = %err, "Demo sale rejected"),
        }
    }

    orchestrator
        .expense(ExpenseRequest {
            store_id: "bar".into(),
            description: "Ice delivery".into(),
            amount: Money::from_major(2_500),
            actor_id: Some("manager".into()),
        })
        .await?;

    orchestrator
        .staff_payment(StaffPaymentRequest {
            user_id: "waiter-1".into(),
            store_id: "bar".into(),
            amount: Money::from_major(45_000),
            period: "2026-10".into(),
            actor_id: Some("owner".into()),
        })
        .await?;

    Ok(())
}

fn sale(store_id: &str, lines: Vec<(&str, i64)>, payment_method: PaymentMethod) -> SaleRequest {
    SaleRequest {
        store_id: store_id.into(),
        items: lines
            .into_iter()
            .map(|(product_id, quantity)| SaleLine::new(product_id, quantity))
            .collect(),
        payment_method,
        actor_id: Some("cashier".into()),
        notes: None,
    }
}
