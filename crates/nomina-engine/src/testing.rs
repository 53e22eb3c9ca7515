//! Shared fixtures for engine tests: an isolated store with a small
//! directory, two active statutory rates and the 2026 bracket table.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use nomina_core::{Employee, Money, PayrollBatch, Rate, StatutoryDeductionRate, TaxBracket, TimeEntry};
use nomina_db::{Database, DbConfig};

use crate::config::EngineConfig;
use crate::services::{GenerateBatchRequest, RegisterHoursRequest, SearchBatchesRequest};
use crate::PayrollEngine;

/// (id, name, email, active)
const EMPLOYEES: &[(&str, &str, &str, bool)] = &[
    ("emp-1", "Ana Mora", "ana.mora@example.com", true),
    ("emp-2", "Luis Vega", "luis.vega@example.com", true),
    ("emp-3", "Marta Solis", "marta.solis@example.com", false),
];

/// (lower, upper, percent) in major units
const BRACKETS_2026: &[(i64, Option<i64>, u32)] = &[
    (0, Some(922_000), 0),
    (922_000, Some(1_363_000), 10),
    (1_363_000, Some(2_374_000), 15),
    (2_374_000, Some(4_745_000), 20),
    (4_745_000, None, 25),
];

/// 2026 instant at the top of an hour.
pub(crate) fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

/// In-memory store with the fixture data loaded.
pub(crate) async fn database() -> Database {
    seed(Database::new(DbConfig::in_memory()).await.unwrap()).await
}

pub(crate) async fn engine() -> PayrollEngine {
    PayrollEngine::with_employee_table(database().await, EngineConfig::default())
}

/// File-backed store with several connections, for concurrency tests.
pub(crate) async fn engine_at(path: &Path) -> PayrollEngine {
    let db = Database::new(DbConfig::new(path).max_connections(4)).await.unwrap();
    PayrollEngine::with_employee_table(seed(db).await, EngineConfig::default())
}

async fn seed(db: Database) -> Database {
    for (id, name, email, is_active) in EMPLOYEES {
        db.employees()
            .insert(&Employee {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                is_active: *is_active,
            })
            .await
            .unwrap();
    }

    for (name, bps, is_active) in [("Social security", 950, true), ("Popular bank", 100, true), ("Retired levy", 500, false)] {
        db.deduction_config()
            .insert_rate(&StatutoryDeductionRate {
                name: name.to_string(),
                rate_bps: bps,
                is_active,
            })
            .await
            .unwrap();
    }

    for (lower, upper, percent) in BRACKETS_2026 {
        db.deduction_config()
            .insert_bracket(&TaxBracket::new(
                2026,
                Money::from_major(*lower),
                upper.map(Money::from_major),
                Rate::from_percent(*percent),
            ))
            .await
            .unwrap();
    }

    db
}

/// Completed March entry starting at 08:00 on `day`.
pub(crate) async fn closed_entry(engine: &PayrollEngine, employee_id: &str, day: u32, hours: u32, hourly_major: i64) -> TimeEntry {
    engine
        .recorder()
        .register_hours(RegisterHoursRequest {
            entry_id: None,
            employee_id: employee_id.to_string(),
            period_start: at(3, day, 8),
            period_end: Some(at(3, day, 8 + hours)),
            hourly_rate_cents: Money::from_major(hourly_major).cents(),
        })
        .await
        .unwrap()
}

/// Incomplete March entry starting at 08:00 on `day`.
pub(crate) async fn open_entry(engine: &PayrollEngine, employee_id: &str, day: u32) -> TimeEntry {
    engine
        .recorder()
        .register_hours(RegisterHoursRequest {
            entry_id: None,
            employee_id: employee_id.to_string(),
            period_start: at(3, day, 8),
            period_end: None,
            hourly_rate_cents: 3_000_00,
        })
        .await
        .unwrap()
}

/// Generates the whole of March 2026.
pub(crate) async fn generate_march(engine: &PayrollEngine) -> PayrollBatch {
    engine
        .generator()
        .generate(GenerateBatchRequest {
            period_start: at(3, 1, 0),
            period_end: at(3, 31, 23),
            active_employees_only: false,
            comments: None,
        })
        .await
        .unwrap()
}

pub(crate) async fn all_batches(engine: &PayrollEngine) -> Vec<PayrollBatch> {
    engine
        .query()
        .search_batches(SearchBatchesRequest {
            page_size: Some(100),
            ..Default::default()
        })
        .await
        .unwrap()
        .items
}
