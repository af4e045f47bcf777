//! # Seed Data Generator
//!
//! Populates the database with sample inventory, customers and sales for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 40 cars (default)
//! cargo run -p autogest-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p autogest-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p autogest-db --bin seed -- --db ./data/venta_autos_db.db
//! ```
//!
//! ## Generated Data
//! - Cars cycling through common makes/models, years 2015-2024, prices
//!   between $12,000 and $45,000
//! - One customer per name in [`CUSTOMERS`]
//! - One sale for every fifth car
//!
//! Cars are created without photos; attach them through the CLI.

use chrono::{Duration, NaiveDate};
use std::env;

use autogest_core::{FuelType, NewCar, NewCustomer, NewSale, PaymentMethod, Transmission};
use autogest_db::{Database, DbConfig};

/// Makes and their models for realistic test data
const MODELS: &[(&str, &[&str])] = &[
    ("Toyota", &["Corolla", "Camry", "RAV4", "Hilux", "Yaris"]),
    ("Honda", &["Civic", "Accord", "CR-V", "Fit"]),
    ("Nissan", &["Versa", "Sentra", "X-Trail", "Frontier"]),
    ("Mazda", &["2", "3", "CX-5", "CX-30"]),
    ("Volkswagen", &["Jetta", "Golf", "Tiguan", "Vento"]),
    ("Chevrolet", &["Aveo", "Onix", "Tracker", "Silverado"]),
    ("Ford", &["Fiesta", "Focus", "Ranger", "Escape"]),
    ("Kia", &["Rio", "Forte", "Sportage", "Seltos"]),
];

const COLORS: &[&str] = &["Blanco", "Negro", "Gris", "Rojo", "Azul", "Plata", "Verde"];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Ana Pérez", "555-0101", "ana.perez@example.com"),
    ("Luis Gómez", "555-0102", "luis.gomez@example.com"),
    ("Carla Ruiz", "555-0103", "carla.ruiz@example.com"),
    ("Jorge Herrera", "555-0104", ""),
    ("María Torres", "", "maria.torres@example.com"),
    ("Pedro Sánchez", "555-0106", "pedro.sanchez@example.com"),
    ("Lucía Navarro", "555-0107", ""),
    ("Diego Castro", "555-0108", "diego.castro@example.com"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./venta_autos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("AutoGest Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of cars to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./venta_autos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 AutoGest Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Cars:     {}", count);
    println!();

    let db = Database::open(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");

    // Check existing data
    let existing = db.cars().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} cars", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        db.close().await;
        return Ok(());
    }

    // Customers first: sales reference them
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, phone, email) in CUSTOMERS {
        let customer = NewCustomer {
            name: name.to_string(),
            phone: non_blank(phone),
            email: non_blank(email),
            address: None,
        };
        customer_ids.push(db.customers().create(&customer).await?);
    }
    println!("✓ Generated {} customers", customer_ids.len());

    let start = std::time::Instant::now();
    let mut car_ids = Vec::with_capacity(count);

    for seed in 0..count {
        let car = generate_car(seed);
        match db.cars().create(&car, None).await {
            Ok(id) => car_ids.push((id, car.price_cents)),
            Err(e) => eprintln!("Failed to insert {} {}: {}", car.make, car.model, e),
        }
    }

    println!(
        "✓ Generated {} cars in {:?}",
        car_ids.len(),
        start.elapsed()
    );

    let base_date = NaiveDate::from_ymd_opt(2024, 1, 8).ok_or("invalid base date")?;
    let mut sales = 0;
    for (n, (car_id, price_cents)) in car_ids.iter().enumerate().filter(|(n, _)| n % 5 == 0) {
        if customer_ids.is_empty() {
            break;
        }

        let sale = NewSale {
            car_id: *car_id,
            customer_id: customer_ids[n % customer_ids.len()],
            // 5% negotiated off list price
            amount_cents: price_cents * 95 / 100,
            payment_method: PaymentMethod::ALL[n % PaymentMethod::ALL.len()],
            sale_date: base_date + Duration::days(n as i64 * 3),
        };
        db.sales().create(&sale).await?;
        sales += 1;
    }
    println!("✓ Generated {} sales", sales);

    // Sanity check
    println!();
    let results = db.cars().search("toyota").await?;
    println!("  Search 'toyota': {} results", results.len());

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single car from `seed`.
fn generate_car(seed: usize) -> NewCar {
    let (make, models) = MODELS[seed % MODELS.len()];
    let model = models[(seed / MODELS.len()) % models.len()];

    // $12,000 - $45,000 in $250 steps
    let price_cents = (12_000 + ((seed * 1_750) % 33_000) as i64 / 250 * 250) * 100;

    NewCar {
        make: make.to_string(),
        model: model.to_string(),
        year: 2015 + (seed % 10) as i32,
        price_cents,
        color: COLORS[seed % COLORS.len()].to_string(),
        transmission: Transmission::ALL[seed % Transmission::ALL.len()],
        fuel: FuelType::ALL[(seed / 3) % FuelType::ALL.len()],
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
