//! # Seed Data Generator
//!
//! Populates a database with a small apparel catalog and loyalty customers
//! for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./strata_dev.db
//! cargo run -p strata-db --bin seed
//!
//! # Specify database path
//! cargo run -p strata-db --bin seed -- --db ./data/strata.db
//! ```
//!
//! ## Generated Data
//! - Every product in every size and color: SKU `{CODE}-{SIZE}-{COLOR}`
//! - Barcodes `290{index:010}` (internal-use EAN prefix, no checksum)
//! - A handful of customers with opening point balances

use rust_decimal::Decimal;
use std::env;
use strata_core::{CatalogItem, Customer, Percent};
use strata_db::{Database, DbConfig};
use uuid::Uuid;

/// (code, name, price in cents, tax rate in basis points, category)
const PRODUCTS: &[(&str, &str, i64, u32, &str)] = &[
    ("TEE", "Crew Tee", 2999, 850, "tops"),
    ("OXF", "Oxford Shirt", 5499, 850, "tops"),
    ("HOD", "Pullover Hoodie", 6499, 850, "tops"),
    ("CHN", "Slim Chino", 5999, 850, "bottoms"),
    ("JNS", "Straight Jeans", 7999, 850, "bottoms"),
    ("SCK", "Crew Socks 3-Pack", 1299, 0, "accessories"),
];

const SIZES: &[&str] = &["S", "M", "L", "XL"];

const COLORS: &[&str] = &["Black", "Blue", "Grey"];

/// (id, first name, last name, email, points, program)
const CUSTOMERS: &[(&str, &str, &str, &str, i64, &str)] = &[
    ("CUST-0001", "Alice", "Ng", "alice@example.com", 1200, "Gold"),
    ("CUST-0002", "Bruno", "Costa", "bruno@example.com", 450, "Silver"),
    ("CUST-0003", "Chidi", "Okafor", "chidi@example.com", 0, "Silver"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./strata_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Strata POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./strata_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Strata POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} variants", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let catalog = db.catalog();
    let mut generated = 0;
    let mut index = 0usize;

    for (code, name, price_cents, tax_bps, category) in PRODUCTS {
        let product_id = Uuid::new_v4().to_string();

        for size in SIZES {
            for color in COLORS {
                index += 1;
                let item = generate_variant(
                    &product_id, code, name, *price_cents, *tax_bps, category, size, color, index,
                );

                if let Err(e) = catalog.insert(&item).await {
                    eprintln!("Failed to insert {}: {}", item.sku, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} variants", generated);

    println!();
    println!("Generating customers...");

    let customers = db.customers();
    for (id, first, last, email, points, program) in CUSTOMERS {
        let customer = Customer {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: Some(email.to_string()),
            loyalty_points: *points,
            loyalty_program: Some(program.to_string()),
        };

        if let Err(e) = customers.insert(&customer).await {
            eprintln!("Failed to insert {}: {}", customer.id, e);
            continue;
        }
        println!("  {} {} ({} points)", customer.id, customer.display_name(), points);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one sellable variant with deterministic stock.
#[allow(clippy::too_many_arguments)]
fn generate_variant(
    product_id: &str,
    code: &str,
    name: &str,
    price_cents: i64,
    tax_bps: u32,
    category: &str,
    size: &str,
    color: &str,
    index: usize,
) -> CatalogItem {
    let color_code = color[..3].to_uppercase();

    CatalogItem {
        product_id: product_id.to_string(),
        variant_id: Uuid::new_v4().to_string(),
        sku: format!("{}-{}-{}", code, size, color_code),
        barcode: Some(format!("290{:010}", index)),
        name: name.to_string(),
        size: Some(size.to_string()),
        color: Some(color.to_string()),
        unit_price: Decimal::new(price_cents, 2),
        tax_percent: Percent::from_bps(tax_bps),
        category_id: Some(category.to_string()),
        // Sizes at the edges run thin
        quantity_on_hand: if size == "S" || size == "XL" { 4 } else { 12 },
        allow_negative_stock: false,
    }
}
