//! # Payroll Calculations
//!
//! Pure pay, deduction and tax arithmetic plus the entry/batch state
//! transitions. The engine loads rows, calls these functions, and persists
//! the result; nothing here touches storage.
//!
//! ## Per-Entry Computation at Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gross = base_pay + overtime_pay + bonus_total                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  statutory = Σ active rates  round(gross × rate)                        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  net_before_tax = gross − statutory                                     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  income_tax = Σ brackets  round(slice × rate)                           │
//! │     where slice = min(upper ?? ∞, net_before_tax) − lower, ≥ 0          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  net = gross − (statutory + income_tax)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Each statutory rate and each bracket slice is rounded to the cent on its
//! own (half away from zero), then summed. Totals are sums of rounded
//! figures, so a batch total always equals the sum of its entries.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Hours, Money, Rate};
use crate::types::{BatchState, EntryState, PayrollBatch, StatutoryDeductionRate, TaxBracket, TimeEntry};
use crate::validation;

// =============================================================================
// Hours and Registration
// =============================================================================

/// Whole hours between two instants, rounded down.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use nomina_core::payroll::hours_between;
///
/// let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2026, 3, 2, 16, 59, 59).unwrap();
/// assert_eq!(hours_between(start, end), 8);
/// ```
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_hours().max(0)
}

/// Registers (or re-registers) the work period of an entry.
///
/// - closed period: hours = floor(end − start), state = Completed,
///   base pay = hours × hourly rate
/// - open period: hours = 0, state = Incomplete, base pay = 0
///
/// Overtime and bonuses already on the entry are kept; gross pay follows
/// automatically because it is always derived from the components. A base
/// pay or gross that does not fit in the money range is rejected and the
/// entry is left untouched.
pub fn register_hours(
    entry: &mut TimeEntry,
    period_start: DateTime<Utc>,
    period_end: Option<DateTime<Utc>>,
    hourly_rate: Money,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validation::validate_period("period", period_start, period_end)?;
    validation::validate_amount("hourly_rate", hourly_rate)?;
    entry.ensure_unlocked()?;

    let (hours, base_pay, state) = match period_end {
        Some(end) => {
            let hours = hours_between(period_start, end);
            let base_pay = hourly_rate.checked_mul(hours).ok_or_else(|| overflow("base_pay"))?;
            (hours, base_pay, EntryState::Completed)
        }
        None => (0, Money::zero(), EntryState::Incomplete),
    };
    checked_gross(base_pay, entry.overtime_pay(), entry.bonus_total())?;

    entry.period_start = period_start;
    entry.period_end = period_end;
    entry.hourly_rate_cents = hourly_rate.cents();
    entry.hours_worked = hours;
    entry.base_pay_cents = base_pay.cents();
    entry.state = state;
    entry.updated_at = now;
    Ok(())
}

// =============================================================================
// Overtime and Bonuses
// =============================================================================

/// Sets the overtime of an entry.
///
/// Overtime pay is stored as its own component (`hours × rate`); it is
/// never derived by subtracting an earlier value from the gross.
pub fn apply_overtime(
    entry: &mut TimeEntry,
    hours: Hours,
    overtime_rate: Money,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validation::validate_overtime(hours)?;
    validation::validate_amount("overtime_rate", overtime_rate)?;
    entry.ensure_unlocked()?;

    let overtime_pay = overtime_rate
        .checked_multiply_hours(hours)
        .ok_or_else(|| overflow("overtime_pay"))?;
    checked_gross(entry.base_pay(), overtime_pay, entry.bonus_total())?;

    entry.overtime_hundredths = hours.hundredths();
    entry.overtime_rate_cents = overtime_rate.cents();
    entry.overtime_pay_cents = overtime_pay.cents();
    entry.updated_at = now;
    Ok(())
}

/// Premium over the hourly rate paid for overtime when no rate is given.
pub const OVERTIME_PREMIUM: Rate = Rate::from_bps(15_000);

/// Overtime rate derived from an hourly rate (time and a half).
pub fn default_overtime_rate(hourly_rate: Money) -> Money {
    hourly_rate.apply_rate(OVERTIME_PREMIUM)
}

/// Moves the bonus total of an entry by `delta` (positive on add, the
/// difference on edit, negative on removal).
pub fn apply_bonus_delta(entry: &mut TimeEntry, delta: Money, now: DateTime<Utc>) -> CoreResult<()> {
    entry.ensure_unlocked()?;

    let total = entry.bonus_total().checked_add(delta).ok_or_else(|| overflow("bonus_total"))?;
    validation::validate_non_negative("bonus_total", total)?;
    checked_gross(entry.base_pay(), entry.overtime_pay(), total)?;

    entry.bonus_total_cents = total.cents();
    entry.updated_at = now;
    Ok(())
}

fn overflow(field: &str) -> CoreError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
    .into()
}

/// Gross pay of the given components, failing when it leaves the money range.
fn checked_gross(base_pay: Money, overtime_pay: Money, bonus_total: Money) -> CoreResult<Money> {
    base_pay
        .checked_add(overtime_pay)
        .and_then(|sum| sum.checked_add(bonus_total))
        .ok_or_else(|| overflow("gross_pay"))
}

// =============================================================================
// Statutory Deductions
// =============================================================================

/// Sum of every active statutory rate applied to the gross.
pub fn statutory_deductions(gross: Money, rates: &[StatutoryDeductionRate]) -> CoreResult<Money> {
    rates
        .iter()
        .filter(|r| r.is_active)
        .try_fold(Money::zero(), |total, r| {
            gross
                .checked_apply_rate(r.rate())
                .and_then(|part| total.checked_add(part))
                .ok_or_else(|| overflow("statutory_deductions"))
        })
}

// =============================================================================
// Progressive Tax Schedule
// =============================================================================

/// A validated progressive bracket table for one fiscal year.
///
/// ## Shape
/// ```text
///   0 ────── 922,000 ────── 1,363,000 ────── 2,374,000 ──── … ──── ∞
///   │   0%    │      10%     │       15%      │    20%     …  25%  │
///   └─────────┴──────────────┴────────────────┴──────────────────────┘
///   ascending, contiguous, non-overlapping, exactly one unbounded top
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    fiscal_year: i32,
    brackets: Vec<TaxBracket>,
}

impl TaxSchedule {
    /// Builds a schedule, sorting by lower bound and rejecting malformed tables.
    pub fn new(mut brackets: Vec<TaxBracket>) -> CoreResult<Self> {
        if brackets.is_empty() {
            return Err(CoreError::InvalidTaxSchedule("bracket table is empty".to_string()));
        }

        brackets.sort_by_key(|b| b.lower_bound_cents);
        let fiscal_year = brackets[0].fiscal_year;

        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.fiscal_year != fiscal_year {
                return Err(CoreError::InvalidTaxSchedule(format!(
                    "brackets mix fiscal years {} and {}",
                    fiscal_year, bracket.fiscal_year
                )));
            }
            if bracket.lower_bound_cents < 0 {
                return Err(CoreError::InvalidTaxSchedule(format!(
                    "bracket {} has a negative lower bound",
                    index
                )));
            }
            if bracket.rate_bps > Rate::FULL_BPS {
                return Err(CoreError::InvalidTaxSchedule(format!(
                    "bracket {} rate {} exceeds 100%",
                    index,
                    bracket.rate()
                )));
            }

            let is_top = index + 1 == brackets.len();
            match (bracket.upper_bound(), is_top) {
                (None, true) => {}
                (None, false) => {
                    return Err(CoreError::InvalidTaxSchedule(format!(
                        "bracket {} is unbounded but is not the top bracket",
                        index
                    )));
                }
                (Some(_), true) => {
                    return Err(CoreError::InvalidTaxSchedule(
                        "top bracket must be unbounded".to_string(),
                    ));
                }
                (Some(upper), false) => {
                    if upper <= bracket.lower_bound() {
                        return Err(CoreError::InvalidTaxSchedule(format!(
                            "bracket {} upper bound {} is not above its lower bound {}",
                            index,
                            upper,
                            bracket.lower_bound()
                        )));
                    }
                    let next = &brackets[index + 1];
                    if upper != next.lower_bound() {
                        return Err(CoreError::InvalidTaxSchedule(format!(
                            "gap or overlap between {} and {}",
                            upper,
                            next.lower_bound()
                        )));
                    }
                }
            }
        }

        Ok(TaxSchedule {
            fiscal_year,
            brackets,
        })
    }

    #[inline]
    pub fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }

    #[inline]
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Progressive income tax on `net_before_tax`.
    ///
    /// Only the portion of income inside each bracket is taxed at that
    /// bracket's rate. Zero or negative income owes nothing.
    ///
    /// ## Example
    /// ```text
    /// net_before_tax = 1,500,000
    ///   0 – 922,000          @ 0%   →      0
    ///   922,000 – 1,363,000  @ 10%  → 44,100
    ///   1,363,000 – 1,500,000 @ 15% → 20,550
    ///   ─────────────────────────────────────
    ///                                 64,650
    /// ```
    pub fn income_tax(&self, net_before_tax: Money) -> Money {
        let mut tax = Money::zero();

        for bracket in &self.brackets {
            let lower = bracket.lower_bound();
            if net_before_tax <= lower {
                break;
            }
            let ceiling = match bracket.upper_bound() {
                Some(upper) => upper.min(net_before_tax),
                None => net_before_tax,
            };
            let slice = (ceiling - lower).clamp_non_negative();
            tax += slice.apply_rate(bracket.rate());
        }

        tax
    }
}

// =============================================================================
// Entry Figures
// =============================================================================

/// Computed pay figures of one entry at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryFigures {
    pub gross: Money,
    pub statutory_deductions: Money,
    pub income_tax: Money,
    pub net: Money,
}

impl EntryFigures {
    /// Statutory deductions plus income tax.
    #[inline]
    pub fn total_deductions(&self) -> Money {
        self.statutory_deductions + self.income_tax
    }
}

/// Computes deductions, tax and net pay for an entry.
///
/// Fails with [`ValidationError::Overflow`] when a figure leaves the money
/// range (a stored entry with absurd components, or statutory rates that
/// add up past 100%).
pub fn compute_figures(
    entry: &TimeEntry,
    rates: &[StatutoryDeductionRate],
    schedule: &TaxSchedule,
) -> CoreResult<EntryFigures> {
    let gross = checked_gross(entry.base_pay(), entry.overtime_pay(), entry.bonus_total())?;
    let statutory = statutory_deductions(gross, rates)?;
    let net_before_tax = gross.checked_sub(statutory).ok_or_else(|| overflow("net_pay"))?;
    let income_tax = schedule.income_tax(net_before_tax);
    let net = statutory
        .checked_add(income_tax)
        .and_then(|deductions| gross.checked_sub(deductions))
        .ok_or_else(|| overflow("net_pay"))?;

    Ok(EntryFigures {
        gross,
        statutory_deductions: statutory,
        income_tax,
        net,
    })
}

/// Locks a completed entry into a batch with its computed figures.
pub fn lock_entry(
    entry: &mut TimeEntry,
    batch_id: &str,
    figures: &EntryFigures,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    match entry.state {
        EntryState::Completed => {}
        EntryState::Incomplete => return Err(CoreError::IncompleteEntriesPresent { count: 1 }),
        EntryState::Processed => {
            return Err(CoreError::EntryLocked {
                entry_id: entry.id.clone(),
                batch_id: entry.batch_id.clone().unwrap_or_default(),
            })
        }
    }

    entry.statutory_deductions_cents = figures.statutory_deductions.cents();
    entry.income_tax_cents = figures.income_tax.cents();
    entry.net_pay_cents = figures.net.cents();
    entry.batch_id = Some(batch_id.to_string());
    entry.state = EntryState::Processed;
    entry.updated_at = now;
    Ok(())
}

// =============================================================================
// Batch Totals
// =============================================================================

/// Aggregated totals over the members of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchTotals {
    pub gross: Money,
    pub deductions: Money,
    pub net: Money,
    pub entry_count: i64,
}

/// Sums entry figures into batch totals.
pub fn batch_totals<'a>(figures: impl IntoIterator<Item = &'a EntryFigures>) -> CoreResult<BatchTotals> {
    figures.into_iter().try_fold(BatchTotals::default(), |acc, f| -> CoreResult<BatchTotals> {
        let sum = |total: Money, part: Money, field: &str| total.checked_add(part).ok_or_else(|| overflow(field));
        let deductions = f
            .statutory_deductions
            .checked_add(f.income_tax)
            .ok_or_else(|| overflow("total_deductions"))?;

        Ok(BatchTotals {
            gross: sum(acc.gross, f.gross, "total_gross")?,
            deductions: sum(acc.deductions, deductions, "total_deductions")?,
            net: sum(acc.net, f.net, "total_net")?,
            entry_count: acc.entry_count + 1,
        })
    })
}

/// Fiscal year whose bracket table applies to a payroll period.
#[inline]
pub fn fiscal_year_of(period_end: DateTime<Utc>) -> i32 {
    period_end.year()
}

/// Fails when a batch can no longer be reverted.
pub fn ensure_revertible(batch: &PayrollBatch) -> CoreResult<()> {
    match batch.state {
        BatchState::Generated => Ok(()),
        BatchState::Voided => Err(CoreError::BatchAlreadyVoided(batch.id.clone())),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const YEAR: i32 = 2026;

    fn schedule() -> TaxSchedule {
        TaxSchedule::new(vec![
            TaxBracket::new(YEAR, Money::from_major(2_374_000), Some(Money::from_major(4_745_000)), Rate::from_percent(20)),
            TaxBracket::new(YEAR, Money::zero(), Some(Money::from_major(922_000)), Rate::zero()),
            TaxBracket::new(YEAR, Money::from_major(4_745_000), None, Rate::from_percent(25)),
            TaxBracket::new(YEAR, Money::from_major(922_000), Some(Money::from_major(1_363_000)), Rate::from_percent(10)),
            TaxBracket::new(YEAR, Money::from_major(1_363_000), Some(Money::from_major(2_374_000)), Rate::from_percent(15)),
        ])
        .unwrap()
    }

    fn rates() -> Vec<StatutoryDeductionRate> {
        vec![
            StatutoryDeductionRate {
                name: "Social security".to_string(),
                rate_bps: 950,
                is_active: true,
            },
            StatutoryDeductionRate {
                name: "Popular bank".to_string(),
                rate_bps: 100,
                is_active: true,
            },
            StatutoryDeductionRate {
                name: "Retired levy".to_string(),
                rate_bps: 500,
                is_active: false,
            },
        ]
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(YEAR, 3, day, hour, minute, 0).unwrap()
    }

    fn entry() -> TimeEntry {
        TimeEntry::new("e-1", "emp-1", at(2, 8, 0), at(2, 8, 0))
    }

    #[test]
    fn test_schedule_sorted_by_lower_bound() {
        let schedule = schedule();
        let lowers: Vec<i64> = schedule.brackets().iter().map(|b| b.lower_bound().major()).collect();
        assert_eq!(lowers, vec![0, 922_000, 1_363_000, 2_374_000, 4_745_000]);
        assert_eq!(schedule.fiscal_year(), YEAR);
    }

    #[test]
    fn test_income_tax_worked_example() {
        let tax = schedule().income_tax(Money::from_major(1_500_000));
        assert_eq!(tax, Money::from_major(64_650));
    }

    #[test]
    fn test_income_tax_zero_and_below_first_threshold() {
        let schedule = schedule();
        assert_eq!(schedule.income_tax(Money::zero()), Money::zero());
        assert_eq!(schedule.income_tax(Money::from_major(922_000)), Money::zero());
        assert_eq!(schedule.income_tax(Money::from_cents(-500)), Money::zero());
    }

    #[test]
    fn test_income_tax_top_bracket_unbounded() {
        // 44,100 + 151,650 + 474,200 + 25% of 255,000
        let tax = schedule().income_tax(Money::from_major(5_000_000));
        assert_eq!(tax, Money::from_major(44_100 + 151_650 + 474_200 + 63_750));
    }

    #[test]
    fn test_income_tax_monotonic() {
        let schedule = schedule();
        let mut previous = Money::zero();
        for step in 0..=600 {
            let income = Money::from_cents(step * 1_000_003);
            let tax = schedule.income_tax(income);
            assert!(tax >= previous, "tax decreased at {}", income);
            previous = tax;
        }
    }

    #[test]
    fn test_schedule_rejects_gap() {
        let err = TaxSchedule::new(vec![
            TaxBracket::new(YEAR, Money::zero(), Some(Money::from_major(100)), Rate::zero()),
            TaxBracket::new(YEAR, Money::from_major(200), None, Rate::from_percent(10)),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTaxSchedule(_)));
    }

    #[test]
    fn test_schedule_rejects_bounded_top_and_double_unbounded() {
        assert!(TaxSchedule::new(vec![TaxBracket::new(
            YEAR,
            Money::zero(),
            Some(Money::from_major(100)),
            Rate::zero()
        )])
        .is_err());

        assert!(TaxSchedule::new(vec![
            TaxBracket::new(YEAR, Money::zero(), None, Rate::zero()),
            TaxBracket::new(YEAR, Money::from_major(100), None, Rate::from_percent(10)),
        ])
        .is_err());

        assert!(TaxSchedule::new(vec![]).is_err());
    }

    #[test]
    fn test_schedule_rejects_rate_over_hundred_percent() {
        assert!(TaxSchedule::new(vec![TaxBracket::new(
            YEAR,
            Money::zero(),
            None,
            Rate::from_bps(10_001)
        )])
        .is_err());
    }

    #[test]
    fn test_register_closed_period_floors_hours() {
        let mut entry = entry();
        register_hours(&mut entry, at(2, 8, 0), Some(at(2, 17, 45)), Money::from_major(5_000), at(2, 18, 0)).unwrap();

        assert_eq!(entry.hours_worked, 9);
        assert_eq!(entry.state, EntryState::Completed);
        assert_eq!(entry.base_pay(), Money::from_major(45_000));
        assert_eq!(entry.gross_pay(), Money::from_major(45_000));
    }

    #[test]
    fn test_register_open_period_is_incomplete() {
        let mut entry = entry();
        register_hours(&mut entry, at(2, 8, 0), Some(at(2, 16, 0)), Money::from_major(5_000), at(2, 16, 0)).unwrap();
        register_hours(&mut entry, at(2, 8, 0), None, Money::from_major(5_000), at(2, 16, 5)).unwrap();

        assert_eq!(entry.hours_worked, 0);
        assert_eq!(entry.base_pay(), Money::zero());
        assert_eq!(entry.state, EntryState::Incomplete);
    }

    #[test]
    fn test_register_rejects_inverted_period() {
        let mut entry = entry();
        let err = register_hours(&mut entry, at(2, 8, 0), Some(at(2, 7, 0)), Money::from_major(5_000), at(2, 8, 0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvertedPeriod { .. })));
    }

    #[test]
    fn test_overtime_recomputes_gross_from_components() {
        let mut entry = entry();
        register_hours(&mut entry, at(2, 8, 0), Some(at(2, 16, 0)), Money::from_major(1_000), at(2, 16, 0)).unwrap();
        apply_bonus_delta(&mut entry, Money::from_major(500), at(2, 16, 0)).unwrap();

        apply_overtime(&mut entry, Hours::from_whole(3), Money::from_major(1_500), at(2, 19, 0)).unwrap();
        assert_eq!(entry.gross_pay(), Money::from_major(8_000 + 4_500 + 500));

        // Lowering overtime afterwards never double-subtracts
        apply_overtime(&mut entry, Hours::from_hundredths(50), Money::from_major(1_500), at(2, 19, 5)).unwrap();
        assert_eq!(entry.overtime_pay(), Money::from_major(750));
        assert_eq!(entry.gross_pay(), Money::from_major(8_000 + 750 + 500));
    }

    #[test]
    fn test_overtime_over_cap_rejected() {
        let mut entry = entry();
        let err = apply_overtime(&mut entry, Hours::from_hundredths(450), Money::from_major(1), at(2, 9, 0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
        assert_eq!(entry.overtime_hundredths, 0);
    }

    #[test]
    fn test_locked_entry_rejects_mutations() {
        let mut entry = entry();
        register_hours(&mut entry, at(2, 8, 0), Some(at(2, 16, 0)), Money::from_major(1_000), at(2, 16, 0)).unwrap();
        let figures = compute_figures(&entry, &rates(), &schedule()).unwrap();
        lock_entry(&mut entry, "b-1", &figures, at(3, 0, 0)).unwrap();
        let snapshot = entry.clone();

        assert!(matches!(
            apply_overtime(&mut entry, Hours::from_whole(1), Money::from_major(1), at(3, 1, 0)),
            Err(CoreError::EntryLocked { .. })
        ));
        assert!(matches!(
            apply_bonus_delta(&mut entry, Money::from_major(1), at(3, 1, 0)),
            Err(CoreError::EntryLocked { .. })
        ));
        assert!(matches!(
            register_hours(&mut entry, at(2, 8, 0), Some(at(2, 18, 0)), Money::from_major(1), at(3, 1, 0)),
            Err(CoreError::EntryLocked { .. })
        ));
        assert_eq!(entry, snapshot);
    }

    #[test]
    fn test_lock_rejects_incomplete_entry() {
        let mut entry = entry();
        let figures = EntryFigures {
            gross: Money::zero(),
            statutory_deductions: Money::zero(),
            income_tax: Money::zero(),
            net: Money::zero(),
        };
        assert!(matches!(
            lock_entry(&mut entry, "b-1", &figures, at(3, 0, 0)),
            Err(CoreError::IncompleteEntriesPresent { count: 1 })
        ));
    }

    #[test]
    fn test_compute_figures_and_lock() {
        let mut entry = entry();
        entry.state = EntryState::Completed;
        entry.period_end = Some(at(2, 16, 0));
        entry.base_pay_cents = Money::from_major(2_000_000).cents();

        let figures = compute_figures(&entry, &rates(), &schedule()).unwrap();
        // 9.5% + 1% active, 5% inactive rate ignored
        assert_eq!(figures.statutory_deductions, Money::from_major(210_000));
        // 44,100 + 15% of (1,790,000 - 1,363,000)
        assert_eq!(figures.income_tax, Money::from_major(108_150));
        assert_eq!(figures.net, Money::from_major(1_681_850));
        assert_eq!(figures.net, figures.gross - figures.total_deductions());

        lock_entry(&mut entry, "b-1", &figures, at(3, 0, 0)).unwrap();
        assert_eq!(entry.state, EntryState::Processed);
        assert_eq!(entry.batch_id.as_deref(), Some("b-1"));
        assert_eq!(entry.net_pay(), figures.net);
    }

    #[test]
    fn test_batch_totals_sum_members() {
        let a = EntryFigures {
            gross: Money::from_cents(1000),
            statutory_deductions: Money::from_cents(100),
            income_tax: Money::from_cents(50),
            net: Money::from_cents(850),
        };
        let b = EntryFigures {
            gross: Money::from_cents(2000),
            statutory_deductions: Money::from_cents(200),
            income_tax: Money::zero(),
            net: Money::from_cents(1800),
        };

        let totals = batch_totals(&[a, b]).unwrap();
        assert_eq!(totals.gross.cents(), 3000);
        assert_eq!(totals.deductions.cents(), 350);
        assert_eq!(totals.net.cents(), 2650);
        assert_eq!(totals.entry_count, 2);
    }

    #[test]
    fn test_register_rejects_rate_above_max_amount() {
        let mut entry = entry();
        let err = register_hours(&mut entry, at(2, 8, 0), Some(at(2, 16, 0)), Money::from_cents(i64::MAX / 4), at(2, 16, 0))
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
        assert_eq!(entry.state, EntryState::Incomplete);
        assert_eq!(entry.base_pay(), Money::zero());
    }

    #[test]
    fn test_base_pay_overflow_leaves_entry_untouched() {
        let mut entry = entry();
        let snapshot = entry.clone();
        // About 12.9 million hours at the largest accepted rate
        let end = Utc.with_ymd_and_hms(3500, 1, 1, 0, 0, 0).unwrap();

        let err = register_hours(&mut entry, at(2, 8, 0), Some(end), crate::MAX_AMOUNT, at(2, 16, 0)).unwrap_err();

        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
        assert_eq!(entry, snapshot);
    }

    #[test]
    fn test_bonus_and_overtime_reject_gross_overflow() {
        let mut entry = entry();
        entry.state = EntryState::Completed;
        entry.base_pay_cents = i64::MAX - 100;

        let err = apply_bonus_delta(&mut entry, Money::from_cents(101), at(2, 16, 0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
        assert_eq!(entry.bonus_total(), Money::zero());

        let err = apply_overtime(&mut entry, Hours::from_whole(1), Money::from_cents(101), at(2, 16, 0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overflow { .. })));
        assert_eq!(entry.overtime_pay(), Money::zero());

        apply_bonus_delta(&mut entry, Money::from_cents(100), at(2, 16, 0)).unwrap();
        assert_eq!(entry.gross_pay().cents(), i64::MAX);
    }

    #[test]
    fn test_figures_and_totals_report_overflow() {
        let mut entry = entry();
        entry.state = EntryState::Completed;
        entry.base_pay_cents = i64::MAX;
        entry.bonus_total_cents = 1;
        assert!(matches!(
            compute_figures(&entry, &rates(), &schedule()),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));

        entry.bonus_total_cents = 0;
        let doubled = vec![StatutoryDeductionRate {
            name: "Misconfigured".to_string(),
            rate_bps: 20_000,
            is_active: true,
        }];
        assert!(matches!(
            compute_figures(&entry, &doubled, &schedule()),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));

        let huge = EntryFigures {
            gross: Money::from_cents(i64::MAX / 2 + 1),
            statutory_deductions: Money::zero(),
            income_tax: Money::zero(),
            net: Money::from_cents(i64::MAX / 2 + 1),
        };
        assert!(matches!(
            batch_totals(&[huge, huge]),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));
    }

    #[test]
    fn test_lock_rejects_processed_entry() {
        let mut entry = entry();
        entry.state = EntryState::Processed;
        entry.batch_id = Some("b-1".to_string());
        let figures = EntryFigures {
            gross: Money::zero(),
            statutory_deductions: Money::zero(),
            income_tax: Money::zero(),
            net: Money::zero(),
        };

        assert!(matches!(
            lock_entry(&mut entry, "b-2", &figures, at(3, 0, 0)),
            Err(CoreError::EntryLocked { ref batch_id, .. }) if batch_id == "b-1"
        ));
        assert_eq!(entry.batch_id.as_deref(), Some("b-1"));
    }

    #[test]
    fn test_default_overtime_rate_is_time_and_a_half() {
        assert_eq!(default_overtime_rate(Money::from_cents(4_500_00)).cents(), 6_750_00);
        // 0.33 * 1.5 = 0.495 -> 0.50
        assert_eq!(default_overtime_rate(Money::from_cents(33)).cents(), 50);
    }
}
