//! # Payroll Services
//!
//! One service per engine component. Every mutating operation follows the
//! same shape:
//!
//! ```text
//! validate input ──► directory / config reads ──► begin ──► load rows
//!        │                                                     │
//!        ▼                                                     ▼
//!   Validation error                       nomina-core transition (pure)
//!                                                              │
//!                                                              ▼
//!                                      conditional writes ──► commit
//! ```
//!
//! Collaborator and configuration reads happen before `begin()`: they go
//! through the pool, and an in-memory store has a single connection that
//! the open transaction would be holding.

pub mod bonus;
pub mod generator;
pub mod overtime;
pub mod query;
pub mod recorder;
pub mod reversal;

pub use bonus::{AddBonusRequest, BonusLedger, EditBonusRequest, RemoveBonusRequest};
pub use generator::{GenerateBatchRequest, PayrollBatchGenerator};
pub use overtime::{ApplyOvertimeAndBonusRequest, ApplyOvertimeRequest, OvertimeAdjuster};
pub use query::{BatchDetail, EntryDetail, EntrySearchRequest, PayrollQuery, SearchBatchesRequest};
pub use recorder::{RegisterHoursRequest, TimeEntryRecorder};
pub use reversal::{PayrollBatchReversal, RevertConfirmation};

use nomina_core::CoreError;
use tracing::warn;

use crate::error::PayrollError;

/// Logs a payroll rule rejection on an entry and converts it.
pub(crate) fn rejected(entry_id: &str, err: CoreError) -> PayrollError {
    warn!(entry_id = %entry_id, error = %err, "Operation rejected");
    err.into()
}
