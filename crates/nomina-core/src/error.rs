//! # Error Types
//!
//! Domain-specific error types for nomina-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  nomina-core errors (this file)                                        │
//! │  ├── CoreError        - Payroll rule violations                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  nomina-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  nomina-engine errors                                                  │
//! │  └── PayrollError     - What callers see (Validation / NotFound /      │
//! │                         Conflict / Persistence)                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PayrollError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Payroll rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The entry belongs to a generated batch and its figures are frozen.
    ///
    /// ## When This Occurs
    /// - Re-registering hours on a processed entry
    /// - Adding, editing or removing a bonus on a processed entry
    /// - Applying overtime to a processed entry
    #[error("Entry {entry_id} is locked in batch {batch_id}")]
    EntryLocked { entry_id: String, batch_id: String },

    /// The batch was already voided.
    #[error("Batch {0} is already voided")]
    BatchAlreadyVoided(String),

    /// The bonus was already removed from the ledger.
    #[error("Bonus {0} was already removed")]
    BonusAlreadyRemoved(String),

    /// No complete, unbatched entry falls inside the requested period.
    #[error("No eligible entries between {period_start} and {period_end}")]
    NoEligibleEntries {
        period_start: String,
        period_end: String,
    },

    /// The requested period still holds entries without an end time.
    ///
    /// ## User Workflow
    /// ```text
    /// Generate March payroll
    ///      │
    ///      ▼
    /// 2 entries have no period end
    ///      │
    ///      ▼
    /// IncompleteEntriesPresent { count: 2 } → nothing is locked
    ///      │
    ///      ▼
    /// Payroll office closes the entries, retries
    /// ```
    #[error("{count} incomplete entries present in the requested period")]
    IncompleteEntriesPresent { count: usize },

    /// The bracket table for a fiscal year is missing or malformed.
    #[error("Invalid tax schedule: {0}")]
    InvalidTaxSchedule(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any payroll rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A computed amount does not fit in the money range.
    #[error("{field} is too large to compute")]
    Overflow { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A period ends before it starts.
    #[error("{field} ends before it starts")]
    InvertedPeriod { field: String },

    /// Invalid format (e.g. malformed date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A stored value does not match the request (e.g. employee of an entry).
    #[error("{field} does not match: expected '{expected}', got '{actual}'")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::EntryLocked {
            entry_id: "e-1".to_string(),
            batch_id: "b-9".to_string(),
        };
        assert_eq!(err.to_string(), "Entry e-1 is locked in batch b-9");

        let err = CoreError::IncompleteEntriesPresent { count: 2 };
        assert_eq!(
            err.to_string(),
            "2 incomplete entries present in the requested period"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::OutOfRange {
            field: "overtime_hours".to_string(),
            min: 0,
            max: 4,
        };
        assert_eq!(err.to_string(), "overtime_hours must be between 0 and 4");

        let err = ValidationError::InvertedPeriod {
            field: "period".to_string(),
        };
        assert_eq!(err.to_string(), "period ends before it starts");

        let err = ValidationError::Overflow {
            field: "gross_pay".to_string(),
        };
        assert_eq!(err.to_string(), "gross_pay is too large to compute");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
