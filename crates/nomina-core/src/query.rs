//! # Query Helpers
//!
//! Pure pieces of the read path: period-type lower bounds and pagination
//! arithmetic. SQL lives in nomina-db; these functions decide *what* to ask.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Period Type
// =============================================================================

/// Relative period filter for batch searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// From the first day of the current month.
    Monthly,
    /// From three months before now.
    Quarterly,
    /// From January 1st of the current year.
    Yearly,
}

impl PeriodType {
    /// Parses the CLI/HTTP spelling (`monthly`, `quarterly`, `yearly`).
    pub fn parse(value: &str) -> ValidationResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "monthly" => Ok(PeriodType::Monthly),
            "quarterly" => Ok(PeriodType::Quarterly),
            "yearly" => Ok(PeriodType::Yearly),
            other => Err(ValidationError::InvalidFormat {
                field: "period_type".to_string(),
                reason: format!("'{}' is not monthly, quarterly or yearly", other),
            }),
        }
    }

    /// Start-date lower bound implied by this period type, relative to `now`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use nomina_core::query::PeriodType;
    ///
    /// let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    /// assert_eq!(
    ///     PeriodType::Monthly.lower_bound(now),
    ///     Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    /// );
    /// ```
    pub fn lower_bound(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PeriodType::Monthly => start_of_day(now.year(), now.month(), 1).unwrap_or(now),
            PeriodType::Quarterly => now.checked_sub_months(Months::new(3)).unwrap_or(now),
            PeriodType::Yearly => start_of_day(now.year(), 1, 1).unwrap_or(now),
        }
    }
}

fn start_of_day(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

// =============================================================================
// Pagination
// =============================================================================

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// Validates a page request.
    ///
    /// ## Rules
    /// - `page` starts at 1; 0 is rejected
    /// - `page_size` of 0 is rejected, larger than `max_page_size` is clamped
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> ValidationResult<Self> {
        if page == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }
        if page_size == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page_size".to_string(),
            });
        }

        Ok(Pagination {
            page,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    #[inline]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[inline]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Row offset of the first item on this page.
    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    /// Number of pages needed for `total_items`.
    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            return 0;
        }
        let size = self.page_size as i64;
        (total_items + size - 1) / size
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total_items: i64) -> Self {
        Page {
            items,
            page: pagination.page(),
            page_size: pagination.page_size(),
            total_items,
            total_pages: pagination.total_pages(total_items),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
