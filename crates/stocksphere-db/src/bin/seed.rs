//! # Seed Data Generator
//!
//! Populates the database with a starter admin account and a sample
//! catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p stocksphere-db --bin seed
//!
//! # Specify database path
//! cargo run -p stocksphere-db --bin seed -- --db ./data/stocksphere.db
//!
//! # Custom admin credentials
//! cargo run -p stocksphere-db --bin seed -- --admin-email boss@stocksphere.com --admin-password changeme
//! ```

use std::env;

use stocksphere_core::{NewProduct, Role};
use stocksphere_db::{Database, DbConfig};

/// Sample catalogue: (name, category, price_cents, quantity, min_stock_level)
const CATALOGUE: &[(&str, &str, i64, i64, i64)] = &[
    ("Rice 5kg", "Grocery", 1299, 40, 10),
    ("Wheat Flour 10kg", "Grocery", 1899, 25, 8),
    ("Sugar 1kg", "Grocery", 289, 60, 15),
    ("Cooking Oil 1L", "Grocery", 549, 30, 10),
    ("Salt 800g", "Grocery", 79, 80, 20),
    ("Black Tea 450g", "Beverages", 649, 35, 10),
    ("Instant Coffee 100g", "Beverages", 899, 20, 5),
    ("Orange Juice 1L", "Beverages", 349, 24, 6),
    ("Mineral Water 1.5L", "Beverages", 99, 120, 30),
    ("Cola 1.5L", "Beverages", 189, 48, 12),
    ("Whole Milk 1L", "Dairy", 219, 40, 12),
    ("Butter 250g", "Dairy", 449, 18, 6),
    ("Cheddar Cheese 200g", "Dairy", 599, 15, 5),
    ("Yogurt 500g", "Dairy", 179, 30, 8),
    ("Eggs Dozen", "Dairy", 329, 50, 15),
    ("Dish Soap 500ml", "Household", 249, 35, 10),
    ("Laundry Detergent 1kg", "Household", 699, 22, 6),
    ("Toilet Paper 4-Pack", "Household", 399, 45, 12),
    ("Hand Soap 250ml", "Household", 149, 40, 10),
    ("Matches Box", "Household", 25, 100, 25),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stocksphere_dev.db");
    let mut admin_email = String::from("admin@stocksphere.com");
    let mut admin_password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockSphere Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>            Database file path (default: ./stocksphere_dev.db)");
                println!("      --admin-email <EMAIL>  Admin login email (default: admin@stocksphere.com)");
                println!("      --admin-password <PW>  Admin password (default: admin123)");
                println!("  -h, --help                 Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 StockSphere Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Refuse to seed twice
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating admin account...");
    let admin = db
        .users()
        .create("Admin", &admin_email, &admin_password, Role::Admin)
        .await?;
    println!("✓ Admin: {} ({})", admin.email, admin.id);

    println!();
    println!("Seeding catalogue...");
    let start = std::time::Instant::now();
    let mut seeded = 0;

    for (name, category, price_cents, quantity, min_stock_level) in CATALOGUE {
        let new = NewProduct {
            name: (*name).to_string(),
            description: None,
            price_cents: *price_cents,
            quantity: *quantity,
            category: (*category).to_string(),
            min_stock_level: *min_stock_level,
        };

        if let Err(e) = db.products().insert(&new).await {
            eprintln!("Failed to insert {}: {}", name, e);
            continue;
        }

        seeded += 1;
    }

    println!("✓ Seeded {} products in {:?}", seeded, start.elapsed());

    let low = db.products().list_low_stock().await?;
    println!("  {} products currently at or below minimum stock", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
