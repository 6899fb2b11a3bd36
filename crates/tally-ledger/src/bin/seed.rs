//! # Seed Data Generator
//!
//! Populates the store with sample products and customers for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p tally-ledger --bin seed
//!
//! # Specify database path
//! cargo run -p tally-ledger --bin seed -- --db ./data/tally.db
//! ```

use chrono::Utc;
use std::env;
use tally_core::{Customer, Product};
use tally_ledger::{LedgerStore, StoreConfig};
use uuid::Uuid;

/// (sku prefix, name, price cents, vat bps, stock, critical level)
const PRODUCTS: &[(&str, &str, i64, u32, i64, i64)] = &[
    ("BEV", "Sparkling Water 330ml", 149, 1000, 120, 24),
    ("BEV", "Cola 330ml", 199, 1000, 200, 48),
    ("BEV", "Orange Juice 1L", 349, 1000, 60, 12),
    ("SNK", "Salted Crisps", 229, 1800, 80, 20),
    ("SNK", "Chocolate Bar", 179, 1800, 150, 30),
    ("GRO", "Pasta 500g", 259, 800, 90, 15),
    ("GRO", "Rice 1kg", 429, 800, 70, 15),
    ("GRO", "Olive Oil 1L", 1299, 800, 40, 8),
    ("HHD", "Dish Soap", 399, 1800, 55, 10),
    ("HHD", "Paper Towels", 549, 1800, 35, 10),
];

const CUSTOMERS: &[(&str, i64)] = &[
    ("Cafe Meridian", 250_000),
    ("Hotel Arcadia", 500_000),
    ("Walk-in Trade", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "./tally.db".to_string());
    println!("Seeding store at {db_path}");

    let store = LedgerStore::new(StoreConfig::new(&db_path)).await?;
    let now = Utc::now();

    for (i, (prefix, name, price, vat, stock, critical)) in PRODUCTS.iter().enumerate() {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: format!("{}-{:03}", prefix, i + 1),
            name: name.to_string(),
            sale_price_cents: *price,
            vat_rate_bps: *vat,
            stock_quantity: *stock,
            critical_stock_level: *critical,
            created_at: now,
            updated_at: now,
        };
        store.products().insert(&product).await?;
    }

    for (name, credit_limit) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            balance_cents: 0,
            credit_limit_cents: *credit_limit,
            created_at: now,
            updated_at: now,
        };
        store.customers().insert(&customer).await?;
    }

    println!(
        "Seeded {} products and {} customers",
        PRODUCTS.len(),
        CUSTOMERS.len()
    );

    Ok(())
}

/// Parses `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
