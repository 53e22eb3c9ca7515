//! # Validation Module
//!
//! Input validation for the payroll operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Engine service (nomina-engine)                               │
//! │  └── THIS MODULE: shape of the request (ranges, lengths, periods)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Payroll rules (payroll.rs)                                   │
//! │  └── State rules: locked entries, incomplete periods, voided batches   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK / NOT NULL constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nomina_core::money::Hours;
//! use nomina_core::validation::validate_overtime;
//!
//! assert!(validate_overtime(Hours::from_hundredths(250)).is_ok());
//! assert!(validate_overtime(Hours::from_hundredths(401)).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::{Hours, Money};
use crate::{MAX_ACTOR_LENGTH, MAX_AMOUNT, MAX_NOTE_LENGTH, MAX_OVERTIME};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers and Text
// =============================================================================

/// Validates that an identifier is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a free-text note (bonus reason, batch comment).
///
/// ## Returns
/// The trimmed note.
pub fn validate_note(field: &str, note: &str) -> ValidationResult<String> {
    let note = note.trim();

    if note.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(note.to_string())
}

/// Validates the actor recorded on audit rows.
pub fn validate_actor(actor: &str) -> ValidationResult<String> {
    let actor = actor.trim();

    if actor.is_empty() {
        return Err(ValidationError::Required {
            field: "actor".to_string(),
        });
    }

    if actor.chars().count() > MAX_ACTOR_LENGTH {
        return Err(ValidationError::TooLong {
            field: "actor".to_string(),
            max: MAX_ACTOR_LENGTH,
        });
    }

    Ok(actor.to_string())
}

// =============================================================================
// Periods
// =============================================================================

/// Validates that a period does not end before it starts.
///
/// An open period (`end == None`) is always valid.
pub fn validate_period(
    field: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    match end {
        Some(end) if end < start => Err(ValidationError::InvertedPeriod {
            field: field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an overtime amount against the legal cap.
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed [`MAX_OVERTIME`] (4 hours)
pub fn validate_overtime(hours: Hours) -> ValidationResult<()> {
    if hours.is_negative() || hours > MAX_OVERTIME {
        return Err(ValidationError::OutOfRange {
            field: "overtime_hours".to_string(),
            min: 0,
            max: MAX_OVERTIME.hundredths() / 100,
        });
    }
    Ok(())
}

/// Validates a rate or amount that may be zero but never negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a requested rate: zero or more, at most [`MAX_AMOUNT`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    validate_non_negative(field, amount)?;
    validate_at_most_max(field, amount)
}

/// Validates an amount that must be strictly positive (bonus awards),
/// at most [`MAX_AMOUNT`].
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_at_most_max(field, amount)
}

fn validate_at_most_max(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT.major(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
