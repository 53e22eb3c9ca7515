//! # nomina-core: Pure Payroll Logic for Nomina
//!
//! This crate is the **heart** of the payroll engine. It contains the pay,
//! deduction and tax arithmetic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Nomina Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 nomina-engine (services + CLI)                  │   │
//! │  │  register_hours, apply_overtime, generate, revert, search       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ nomina-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  payroll  │  │ validation│  │   │
//! │  │   │ TimeEntry │  │   Money   │  │ TaxSched. │  │   rules   │  │   │
//! │  │   │   Batch   │  │   Rate    │  │ Deduction │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  nomina-db (Database Layer)                     │   │
//! │  │          SQLite queries, migrations, transactional repos        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money (integer cents), Rate (basis points), Hours (hundredths)
//! - [`types`] - Domain types (TimeEntry, Bonus, PayrollBatch, TaxBracket, ...)
//! - [`payroll`] - Pay, deduction and progressive tax calculations
//! - [`query`] - Period filters and pagination math for read paths
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use nomina_core::money::{Money, Rate};
//! use nomina_core::payroll::TaxSchedule;
//! use nomina_core::types::TaxBracket;
//!
//! let schedule = TaxSchedule::new(vec![
//!     TaxBracket::new(2026, Money::zero(), Some(Money::from_major(922_000)), Rate::zero()),
//!     TaxBracket::new(2026, Money::from_major(922_000), None, Rate::from_bps(1000)),
//! ])
//! .unwrap();
//!
//! // Only the slice above 922,000 is taxed at 10%
//! let tax = schedule.income_tax(Money::from_major(1_000_000));
//! assert_eq!(tax, Money::from_major(7_800));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod payroll;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Hours, Money, Rate};
pub use payroll::{EntryFigures, TaxSchedule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Legal daily overtime cap.
///
/// ## Business Reason
/// Labour law forbids registering more than four overtime hours on a
/// single work entry.
pub const MAX_OVERTIME: Hours = Hours::from_whole(4);

/// Largest hourly rate, overtime rate or bonus a request may carry
/// (ten billion in major units).
pub const MAX_AMOUNT: Money = Money::from_major(10_000_000_000);

/// Maximum length of a bonus reason or batch comment.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Maximum length of an actor identifier recorded in audit rows.
pub const MAX_ACTOR_LENGTH: usize = 100;
