//! # Payroll Error Type
//!
//! The discriminated result of every public engine operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Flow in Nomina                               │
//! │                                                                         │
//! │  ValidationError ──────────────────────────────┐                        │
//! │  (period inverted, overtime over cap, page 0)   │                        │
//! │                                                 ▼                        │
//! │  CoreError ── EntryLocked / BatchAlreadyVoided ─► Conflict              │
//! │           └── NoEligibleEntries / Incomplete... ─► Validation           │
//! │                                                                         │
//! │  DbError ──── NotFound ─────────────────────────► NotFound              │
//! │          ├─── Conflict / Busy / UniqueViolation ─► Conflict             │
//! │          ├─── ForeignKeyViolation ──────────────► Validation            │
//! │          └─── everything else ── error!(..) ────► Persistence           │
//! │                                                                         │
//! │  PayrollError ── to_response() ──► { "code": "CONFLICT", "message" }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed operation never commits: every service drops its transaction on
//! the first `?`, which rolls it back.

use nomina_core::{CoreError, ValidationError};
use nomina_db::DbError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong, as one of four kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayrollError {
    /// Malformed input or a precondition on the input data.
    #[error("{0}")]
    Validation(String),

    /// A referenced entry, bonus, batch or employee does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The current state forbids the operation.
    #[error("{0}")]
    Conflict(String),

    /// The store failed. The message is generic; details go to the log.
    #[error("{0}")]
    Persistence(String),
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Conflict,
    PersistenceError,
}

/// Serializable envelope for callers presenting errors to people.
///
/// ```json
/// { "code": "CONFLICT", "message": "Entry e-1 is locked in batch b-7" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl PayrollError {
    pub fn validation(message: impl Into<String>) -> Self {
        PayrollError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        PayrollError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PayrollError::Conflict(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PayrollError::Validation(_) => ErrorCode::ValidationError,
            PayrollError::NotFound { .. } => ErrorCode::NotFound,
            PayrollError::Conflict(_) => ErrorCode::Conflict,
            PayrollError::Persistence(_) => ErrorCode::PersistenceError,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<ValidationError> for PayrollError {
    fn from(err: ValidationError) -> Self {
        PayrollError::Validation(err.to_string())
    }
}

impl From<CoreError> for PayrollError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EntryLocked { .. } | CoreError::BatchAlreadyVoided(_) | CoreError::BonusAlreadyRemoved(_) => {
                PayrollError::Conflict(err.to_string())
            }
            CoreError::Validation(inner) => inner.into(),
            CoreError::NoEligibleEntries { .. }
            | CoreError::IncompleteEntriesPresent { .. }
            | CoreError::InvalidTaxSchedule(_) => PayrollError::Validation(err.to_string()),
        }
    }
}

impl From<DbError> for PayrollError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PayrollError::NotFound { entity, id },
            DbError::Conflict { .. } => {
                tracing::warn!(error = %err, "Optimistic update lost");
                PayrollError::Conflict(err.to_string())
            }
            DbError::Busy(e) => {
                tracing::warn!(error = %e, "Store busy, operation rolled back");
                PayrollError::conflict("Another payroll operation holds the store; retry")
            }
            DbError::UniqueViolation { field, value } => {
                PayrollError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                PayrollError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                PayrollError::Persistence("Database connection failed".to_string())
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                PayrollError::Persistence("Database migration failed".to_string())
            }
            DbError::PoolExhausted => PayrollError::Persistence("Database pool exhausted".to_string()),
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                PayrollError::Persistence("Database operation failed".to_string())
            }
        }
    }
}

impl From<sqlx::Error> for PayrollError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Result type for engine operations.
pub type PayrollResult<T> = Result<T, PayrollError>;
