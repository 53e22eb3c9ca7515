//! # nomina-engine: Payroll Services
//!
//! Runs the payroll operations against a nomina-db store: register hours,
//! manage bonuses and overtime, generate and revert batches, search.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  `nomina` CLI / embedding application                                  │
//! │       │  RegisterHours, ApplyOvertimeAndBonus, GenerateBatch, ...       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 nomina-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   PayrollEngine ──► TimeEntryRecorder     BonusLedger           │   │
//! │  │                     OvertimeAdjuster      PayrollBatchGenerator │   │
//! │  │                     PayrollBatchReversal  PayrollQuery          │   │
//! │  │                                                                 │   │
//! │  │   EmployeeDirectory (trait)   EngineConfig   PayrollError       │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 ▼                                  ▼                    │
//! │     nomina-core (pure math)             nomina-db (transactions)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use nomina_engine::{EngineConfig, PayrollEngine};
//! use nomina_engine::services::GenerateBatchRequest;
//!
//! let engine = PayrollEngine::connect(EngineConfig::load()?).await?;
//! let batch = engine
//!     .generate_batch(GenerateBatchRequest {
//!         period_start,
//!         period_end,
//!         active_employees_only: true,
//!         comments: None,
//!     })
//!     .await?;
//! ```
//!
//! Every operation returns [`PayrollResult`]; a failed operation leaves the
//! store as it was.

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, EngineConfig};
pub use directory::EmployeeDirectory;
pub use engine::PayrollEngine;
pub use error::{ErrorCode, ErrorResponse, PayrollError, PayrollResult};
