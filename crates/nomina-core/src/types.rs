//! # Domain Types
//!
//! Core domain types used throughout Nomina.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TimeEntry     │   │      Bonus      │   │  PayrollBatch   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  employee_id    │◄──│  entry_id (FK)  │   │  period         │       │
//! │  │  period         │   │  amount_cents   │   │  state          │       │
//! │  │  pay components │   │  reason         │   │  totals         │       │
//! │  │  state, batch_id│──────────────────────────►  id            │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │                     │                 │
//! │                        ┌────────▼────────┐   ┌────────▼────────┐       │
//! │                        │BonusAuditRecord │   │   BatchLine     │       │
//! │                        │ before / after  │   │ frozen figures  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Configuration (read-only): StatutoryDeductionRate, TaxBracket          │
//! │  Collaborator identity:     Employee                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry State Machine
//! ```text
//!                register (no end)        register (with end)
//!   (new) ───────────────────► Incomplete ───────────────────► Completed
//!                                                 ▲               │
//!                                      revert     │               │ generate
//!                                                 │               ▼
//!                                                 └──────────── Processed
//! ```
//!
//! Monetary fields are stored as integer cents (`*_cents: i64`) and exposed
//! as [`Money`] through accessor methods.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Hours, Money, Rate};

// =============================================================================
// Entry State
// =============================================================================

/// Lifecycle state of a time entry.
///
/// Stored as lowercase text. These are the `Incompleta`, `Completada` and
/// `Procesado` states of the payroll office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Work period has no end yet. Never eligible for a batch.
    Incomplete,
    /// Work period closed, pay components editable.
    Completed,
    /// Locked into a generated batch.
    Processed,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Incomplete => "incomplete",
            EntryState::Completed => "completed",
            EntryState::Processed => "processed",
        }
    }
}

impl Default for EntryState {
    fn default() -> Self {
        EntryState::Incomplete
    }
}

// =============================================================================
// Batch State
// =============================================================================

/// Lifecycle state of a payroll batch (`Generada` / `Anulada`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Generated,
    Voided,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Generated => "generated",
            BatchState::Voided => "voided",
        }
    }
}

// =============================================================================
// Bonus Change Kind
// =============================================================================

/// What happened to a bonus in a given audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BonusChange {
    Added,
    Edited,
    Removed,
}

// =============================================================================
// Time Entry
// =============================================================================

/// One work period for one employee, with its derived pay figures.
///
/// ## Invariants
/// - `period_end`, if present, is not before `period_start`
/// - `state == Incomplete` iff `period_end` is absent
/// - `state == Processed` iff `batch_id` is set
/// - gross pay is never stored: it is always
///   `base_pay + overtime_pay + bonus_total`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TimeEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Employee the hours belong to.
    pub employee_id: String,

    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub period_end: Option<DateTime<Utc>>,

    /// Whole hours between start and end (floor). Zero while incomplete.
    pub hours_worked: i64,

    /// Hourly rate used for the base pay, in cents.
    pub hourly_rate_cents: i64,

    /// Overtime in hundredths of an hour (`150` = 1.5 h).
    pub overtime_hundredths: i64,

    /// Overtime hourly rate, in cents.
    pub overtime_rate_cents: i64,

    pub base_pay_cents: i64,
    pub overtime_pay_cents: i64,
    pub bonus_total_cents: i64,

    /// Statutory (non-progressive) withholdings computed at generation.
    pub statutory_deductions_cents: i64,

    /// Progressive income tax computed at generation.
    pub income_tax_cents: i64,

    pub net_pay_cents: i64,

    pub state: EntryState,

    /// Batch this entry is locked into, if any.
    pub batch_id: Option<String>,

    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Creates a blank, incomplete entry for an employee.
    pub fn new(
        id: impl Into<String>,
        employee_id: impl Into<String>,
        period_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        TimeEntry {
            id: id.into(),
            employee_id: employee_id.into(),
            period_start,
            period_end: None,
            hours_worked: 0,
            hourly_rate_cents: 0,
            overtime_hundredths: 0,
            overtime_rate_cents: 0,
            base_pay_cents: 0,
            overtime_pay_cents: 0,
            bonus_total_cents: 0,
            statutory_deductions_cents: 0,
            income_tax_cents: 0,
            net_pay_cents: 0,
            state: EntryState::Incomplete,
            batch_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn hourly_rate(&self) -> Money {
        Money::from_cents(self.hourly_rate_cents)
    }

    #[inline]
    pub fn base_pay(&self) -> Money {
        Money::from_cents(self.base_pay_cents)
    }

    #[inline]
    pub fn overtime_pay(&self) -> Money {
        Money::from_cents(self.overtime_pay_cents)
    }

    #[inline]
    pub fn bonus_total(&self) -> Money {
        Money::from_cents(self.bonus_total_cents)
    }

    #[inline]
    pub fn overtime(&self) -> Hours {
        Hours::from_hundredths(self.overtime_hundredths)
    }

    /// Gross pay, always recomputed from its three components.
    ///
    /// Every payroll operation keeps this sum inside the money range; a
    /// row that breaks that saturates here instead of overflowing.
    #[inline]
    pub fn gross_pay(&self) -> Money {
        self.base_pay().saturating_add(self.overtime_pay()).saturating_add(self.bonus_total())
    }

    #[inline]
    pub fn statutory_deductions(&self) -> Money {
        Money::from_cents(self.statutory_deductions_cents)
    }

    #[inline]
    pub fn income_tax(&self) -> Money {
        Money::from_cents(self.income_tax_cents)
    }

    /// Statutory deductions plus income tax.
    #[inline]
    pub fn total_deductions(&self) -> Money {
        self.statutory_deductions().saturating_add(self.income_tax())
    }

    #[inline]
    pub fn net_pay(&self) -> Money {
        Money::from_cents(self.net_pay_cents)
    }

    /// Fails with [`CoreError::EntryLocked`] when the entry belongs to a batch.
    pub fn ensure_unlocked(&self) -> CoreResult<()> {
        match self.state {
            EntryState::Processed => Err(CoreError::EntryLocked {
                entry_id: self.id.clone(),
                batch_id: self.batch_id.clone().unwrap_or_default(),
            }),
            EntryState::Incomplete | EntryState::Completed => Ok(()),
        }
    }
}

// =============================================================================
// Bonus
// =============================================================================

/// One bonus award on a time entry.
///
/// Removal is a soft delete: `removed_at` is set and the row stays in the
/// ledger. Only bonuses without `removed_at` count toward the entry's
/// bonus total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bonus {
    pub id: String,
    pub entry_id: String,
    pub amount_cents: i64,
    pub reason: String,
    #[ts(as = "String")]
    pub effective_date: NaiveDate,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Bonus {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }
}

/// Immutable audit row written for every bonus change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BonusAuditRecord {
    pub id: String,
    pub bonus_id: String,
    pub entry_id: String,
    pub change: BonusChange,
    pub before_cents: i64,
    pub after_cents: i64,
    pub reason: String,
    pub actor: String,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Payroll Batch
// =============================================================================

/// A locked, aggregated payroll run over a set of entries for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PayrollBatch {
    pub id: String,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    pub state: BatchState,
    pub total_gross_cents: i64,
    pub total_deductions_cents: i64,
    pub total_net_cents: i64,
    pub entry_count: i64,
    /// Fiscal year whose bracket table taxed this batch.
    pub fiscal_year: i32,
    pub comments: Option<String>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl PayrollBatch {
    #[inline]
    pub fn total_gross(&self) -> Money {
        Money::from_cents(self.total_gross_cents)
    }

    #[inline]
    pub fn total_deductions(&self) -> Money {
        Money::from_cents(self.total_deductions_cents)
    }

    #[inline]
    pub fn total_net(&self) -> Money {
        Money::from_cents(self.total_net_cents)
    }
}

/// Frozen per-entry figures of a batch, written once at generation.
///
/// Lines outlive a reversal: the entries are released and zeroed, the
/// lines keep what the voided batch paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BatchLine {
    pub batch_id: String,
    pub entry_id: String,
    pub employee_id: String,
    pub gross_cents: i64,
    pub statutory_deductions_cents: i64,
    pub income_tax_cents: i64,
    pub net_cents: i64,
}

// =============================================================================
// Deduction Configuration
// =============================================================================

/// A named, flat statutory withholding (e.g. social security).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StatutoryDeductionRate {
    pub name: String,
    pub rate_bps: u32,
    pub is_active: bool,
}

impl StatutoryDeductionRate {
    #[inline]
    pub fn rate(&self) -> Rate {
        Rate::from_bps(self.rate_bps)
    }
}

/// One slice of a progressive income-tax schedule for a fiscal year.
///
/// `upper_bound_cents == None` marks the unbounded top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxBracket {
    pub fiscal_year: i32,
    pub lower_bound_cents: i64,
    pub upper_bound_cents: Option<i64>,
    pub rate_bps: u32,
}

impl TaxBracket {
    pub fn new(fiscal_year: i32, lower: Money, upper: Option<Money>, rate: Rate) -> Self {
        TaxBracket {
            fiscal_year,
            lower_bound_cents: lower.cents(),
            upper_bound_cents: upper.map(|m| m.cents()),
            rate_bps: rate.bps(),
        }
    }

    #[inline]
    pub fn lower_bound(&self) -> Money {
        Money::from_cents(self.lower_bound_cents)
    }

    #[inline]
    pub fn upper_bound(&self) -> Option<Money> {
        self.upper_bound_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn rate(&self) -> Rate {
        Rate::from_bps(self.rate_bps)
    }
}

// =============================================================================
// Employee (collaborator identity)
// =============================================================================

/// Employee identity as provided by the employee directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
