//! # nomina-db: Persistence Layer for the Payroll Engine
//!
//! SQLite storage for time entries, bonuses, payroll batches and the
//! deduction configuration, with sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Payroll Data Flow                                │
//! │                                                                         │
//! │  nomina-engine service (GenerateBatch, AddBonus, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     nomina-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ TimeEntryRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BonusRepo      │    │ 001_payroll_ │  │   │
//! │  │   │ begin() → tx  │    │ BatchRepo      │    │   schema.sql │  │   │
//! │  │   │               │    │ DeductionConfig│    │              │  │   │
//! │  │   │               │    │ EmployeeRepo   │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (./nomina.db, or in-memory for tests)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nomina_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./nomina.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let mut entry = db.time_entries().find_in(&mut tx, "entry-id").await?.unwrap();
//! entry.bonus_total_cents += 5_000;
//! db.time_entries().update(&mut tx, &mut entry).await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::batch::{BatchFilter, BatchRepository};
pub use repository::bonus::BonusRepository;
pub use repository::deduction_config::DeductionConfigRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::time_entry::{EntryFilter, TimeEntryRepository};
