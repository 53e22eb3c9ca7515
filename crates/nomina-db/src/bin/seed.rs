//! # Seed Data Generator
//!
//! Loads a demo employee directory, the statutory deduction rates and a
//! progressive bracket table into a payroll database.
//!
//! ## Usage
//! ```bash
//! # Seed ./nomina_dev.db with the current year's bracket table
//! cargo run -p nomina-db --bin seed
//!
//! # Choose database and fiscal year, add one closed entry per employee
//! cargo run -p nomina-db --bin seed -- --db ./data/nomina.db --year 2026 --entries
//! ```
//!
//! ## Bracket Table (amounts in major units)
//! ```text
//!   0         – 922,000     0%
//!   922,000   – 1,363,000   10%
//!   1,363,000 – 2,374,000   15%
//!   2,374,000 – 4,745,000   20%
//!   4,745,000 – ∞           25%
//! ```

use chrono::{Datelike, Duration, TimeZone, Utc};
use nomina_core::payroll::{register_hours, TaxSchedule};
use nomina_core::{Employee, Money, Rate, StatutoryDeductionRate, TaxBracket, TimeEntry};
use nomina_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// (id, name, email, active, hourly rate in major units)
const EMPLOYEES: &[(&str, &str, &str, bool, i64)] = &[
    ("emp-001", "Ana Mora", "ana.mora@example.com", true, 4_500),
    ("emp-002", "Luis Vega", "luis.vega@example.com", true, 3_800),
    ("emp-003", "Marta Solis", "marta.solis@example.com", true, 6_200),
    ("emp-004", "Jorge Castro", "jorge.castro@example.com", true, 2_900),
    ("emp-005", "Sofia Rojas", "sofia.rojas@example.com", false, 3_300),
];

/// (name, basis points, active)
const STATUTORY_RATES: &[(&str, u32, bool)] = &[
    ("Social security", 950, true),
    ("Popular bank", 100, true),
    ("Retired levy", 500, false),
];

/// (lower, upper, percent) in major units
const BRACKETS: &[(i64, Option<i64>, u32)] = &[
    (0, Some(922_000), 0),
    (922_000, Some(1_363_000), 10),
    (1_363_000, Some(2_374_000), 15),
    (2_374_000, Some(4_745_000), 20),
    (4_745_000, None, 25),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./nomina_dev.db");
    let mut fiscal_year = Utc::now().year();
    let mut with_entries = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--year" | "-y" => {
                if i + 1 < args.len() {
                    fiscal_year = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--entries" | "-e" => with_entries = true,
            "--help" | "-h" => {
                println!("Nomina Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./nomina_dev.db)");
                println!("  -y, --year <YEAR>   Fiscal year of the bracket table (default: current year)");
                println!("  -e, --entries       Also add one closed time entry per active employee");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("Nomina Seed Data Generator");
    println!("==========================");
    println!("Database:    {}", db_path);
    println!("Fiscal year: {}", fiscal_year);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    if db.employees().count().await? > 0 || db.deduction_config().rate_count().await? > 0 {
        println!("⚠ Database already holds payroll data");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (id, name, email, is_active, _) in EMPLOYEES {
        db.employees()
            .insert(&Employee {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                is_active: *is_active,
            })
            .await?;
    }
    println!("✓ {} employees", EMPLOYEES.len());

    for (name, bps, is_active) in STATUTORY_RATES {
        db.deduction_config()
            .insert_rate(&StatutoryDeductionRate {
                name: name.to_string(),
                rate_bps: *bps,
                is_active: *is_active,
            })
            .await?;
    }
    println!("✓ {} statutory rates", STATUTORY_RATES.len());

    let brackets: Vec<TaxBracket> = BRACKETS
        .iter()
        .map(|(lower, upper, percent)| {
            TaxBracket::new(
                fiscal_year,
                Money::from_major(*lower),
                upper.map(Money::from_major),
                Rate::from_percent(*percent),
            )
        })
        .collect();

    // Refuse to store a table the generator would reject later
    TaxSchedule::new(brackets.clone())?;

    for bracket in &brackets {
        db.deduction_config().insert_bracket(bracket).await?;
    }
    println!("✓ {} tax brackets for {}", brackets.len(), fiscal_year);

    if with_entries {
        let today = Utc::now().date_naive();
        let start = Utc
            .with_ymd_and_hms(today.year(), today.month(), 1, 8, 0, 0)
            .single()
            .ok_or("invalid start of month")?;
        let end = start + Duration::hours(8);
        let now = Utc::now();

        let mut tx = db.begin().await?;
        let mut created = 0;
        for (id, _, _, is_active, hourly) in EMPLOYEES {
            if !is_active {
                continue;
            }
            let mut entry = TimeEntry::new(Uuid::new_v4().to_string(), *id, start, now);
            register_hours(&mut entry, start, Some(end), Money::from_major(*hourly), now)?;
            db.time_entries().insert(&mut tx, &entry).await?;
            created += 1;
        }
        tx.commit().await?;
        println!("✓ {} closed time entries starting {}", created, start);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
