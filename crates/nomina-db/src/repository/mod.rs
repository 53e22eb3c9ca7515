//! # Repository Module
//!
//! Database repository implementations for the payroll store.
//!
//! ## Reads vs Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads (query path)              Writes (operations)                   │
//! │  ─────────────────               ───────────────────                   │
//! │  repo.get_by_id(id)              let mut tx = db.begin().await?;       │
//! │  repo.search(filter, page)       repo.find_in(&mut tx, id)             │
//! │       │                          repo.update(&mut tx, &mut entry)      │
//! │       │  uses the pool           repo.insert_audit(&mut tx, &record)   │
//! │       ▼                          tx.commit().await?;                   │
//! │  SqlitePool                           │  uses the caller's connection  │
//! │                                       ▼                                 │
//! │                                  one SQLite transaction                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write methods never open their own transaction. The caller decides the
//! transaction boundary, so a ledger row, an entry update and an audit
//! record commit together or not at all.
//!
//! ## Available Repositories
//!
//! - [`TimeEntryRepository`] - Entries, versioned updates, batch locking
//! - [`BonusRepository`] - Bonus ledger and audit trail
//! - [`BatchRepository`] - Batches, batch lines, batch search
//! - [`DeductionConfigRepository`] - Statutory rates and tax brackets
//! - [`EmployeeRepository`] - Employee directory table

pub mod batch;
pub mod bonus;
pub mod deduction_config;
pub mod employee;
pub mod time_entry;

pub use batch::{BatchFilter, BatchRepository};
pub use bonus::BonusRepository;
pub use deduction_config::DeductionConfigRepository;
pub use employee::EmployeeRepository;
pub use time_entry::{EntryFilter, TimeEntryRepository};
