//! # Money Module
//!
//! Provides the `Money`, `Rate` and `Hours` types for payroll arithmetic.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                             │
//! │                                                                         │
//! │  A payroll run sums thousands of gross, deduction and tax figures.     │
//! │  Batch totals MUST equal the sum of their entries to the cent.         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents, Basis Points, Hundredths of an Hour      │
//! │    gross    = 150_000_000 cents                                        │
//! │    rate     = 1000 bps (10%)                                           │
//! │    overtime = 150 (1.5 h)                                              │
//! │  Every product is computed in i128 and rounded once, explicitly.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nomina_core::money::{Hours, Money, Rate};
//!
//! let hourly = Money::from_cents(1_250_00);
//! let pay = hourly.multiply_hours(Hours::from_hundredths(150)); // 1.5 h
//! assert_eq!(pay.cents(), 1_875_00);
//!
//! let deduction = Money::from_major(1_000).apply_rate(Rate::from_bps(1067));
//! assert_eq!(deduction.cents(), 106_70);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Divides with rounding half away from zero.
#[inline]
fn round_div(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Parses `123`, `123.4` or `-123.45` into hundredths.
///
/// More than two decimals is rejected rather than rounded.
fn parse_hundredths(input: &str) -> Option<i64> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || fraction.len() > 2 {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    let value = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -value } else { value })
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: bonus edits produce negative deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// hourly rate ──► base pay ──┐
/// overtime rate ► ot pay ────┼──► gross ──► statutory ──► income tax ──► net
/// bonus ledger ─► bonus total┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use nomina_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(922_000).cents(), 92_200_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a percentage rate and rounds half away from zero to the cent.
    ///
    /// ## Implementation
    /// `round(cents * bps / 10000)` computed in i128. A result outside the
    /// i64 range saturates; use [`Money::checked_apply_rate`] where that
    /// must be an error.
    ///
    /// ## Example
    /// ```rust
    /// use nomina_core::money::{Money, Rate};
    ///
    /// // 4,410,000.00 at 10%
    /// let slice = Money::from_major(441_000);
    /// assert_eq!(slice.apply_rate(Rate::from_bps(1000)), Money::from_major(44_100));
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let cents = round_div(self.0 as i128 * rate.bps() as i128, 10_000);
        Money::from_cents(cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Multiplies an hourly amount by a number of hours expressed in
    /// hundredths, rounding half away from zero to the cent.
    pub fn multiply_hours(&self, hours: Hours) -> Money {
        let cents = round_div(self.0 as i128 * hours.hundredths() as i128, 100);
        Money::from_cents(cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// [`Money::apply_rate`], or `None` when the result does not fit in i64.
    pub fn checked_apply_rate(&self, rate: Rate) -> Option<Money> {
        let cents = round_div(self.0 as i128 * rate.bps() as i128, 10_000);
        i64::try_from(cents).ok().map(Money)
    }

    /// [`Money::multiply_hours`], or `None` when the result does not fit in i64.
    pub fn checked_multiply_hours(&self, hours: Hours) -> Option<Money> {
        let cents = round_div(self.0 as i128 * hours.hundredths() as i128, 100);
        i64::try_from(cents).ok().map(Money)
    }

    /// Multiplies money by a whole quantity (e.g. whole hours worked).
    ///
    /// Returns `None` on overflow.
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds, pinning the result to the i64 range instead of overflowing.
    #[inline]
    pub const fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Returns `self` when positive, zero otherwise.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money::zero()
        } else {
            self
        }
    }
}

/// Display implementation shows `1234.56` with a leading minus for negatives.
///
/// ## Note
/// This is for logs and the CLI. Currency symbols and grouping belong to
/// whatever renders the figures for people.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

/// Parses `1234.56`-style amounts in major units.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Money::from_cents).ok_or_else(|| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not an amount with at most two decimals", s.trim()),
        })
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1067 bps = 10.67% (e.g. a combined social-security withholding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100% expressed in basis points.
    pub const FULL_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage (`15` = 15%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Rate(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Hours
// =============================================================================

/// A decimal number of hours carried as hundredths of an hour.
///
/// `Hours::from_hundredths(150)` is one and a half hours. Overtime is
/// registered in this unit so fractional hours never pass through floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Hours(i64);

impl Hours {
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Hours(hundredths)
    }

    #[inline]
    pub const fn from_whole(hours: i64) -> Self {
        Hours(hours * 100)
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Hours(0)
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

/// Parses decimal hours (`1.5`, `2.25`).
impl FromStr for Hours {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Hours::from_hundredths).ok_or_else(|| ValidationError::InvalidFormat {
            field: "hours".to_string(),
            reason: format!("'{}' is not a number of hours with at most two decimals", s.trim()),
        })
    }
}

impl Default for Hours {
    fn default() -> Self {
        Hours::zero()
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}h", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
