//! # Payroll Batch Reversal
//!
//! Voids a generated batch and returns its entries to the eligible pool.
//! Released entries lose their deduction, tax and net figures; the batch
//! lines keep what the voided batch paid.

use chrono::{DateTime, Utc};
use nomina_core::validation::validate_id;
use nomina_core::{payroll, BatchState};
use nomina_db::Database;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::error::{PayrollError, PayrollResult};

/// Confirmation of a `RevertBatch` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RevertConfirmation {
    pub batch_id: String,
    pub state: BatchState,
    #[ts(as = "String")]
    pub voided_at: DateTime<Utc>,
    /// Entries returned to the completed state.
    pub released_entries: u64,
}

#[derive(Debug, Clone)]
pub struct PayrollBatchReversal {
    db: Database,
}

impl PayrollBatchReversal {
    pub fn new(db: Database) -> Self {
        PayrollBatchReversal { db }
    }

    /// Voids a batch.
    ///
    /// ## Errors
    /// - `NotFound`: no such batch
    /// - `Conflict`: the batch is already voided
    pub async fn revert(&self, batch_id: &str) -> PayrollResult<RevertConfirmation> {
        validate_id("batch_id", batch_id)?;

        let now = Utc::now();
        let batches = self.db.batches();
        let mut tx = self.db.begin().await?;

        let batch = batches
            .find_in(&mut tx, batch_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("PayrollBatch", batch_id))?;

        if let Err(err) = payroll::ensure_revertible(&batch) {
            warn!(batch_id = %batch_id, error = %err, "Batch reversal rejected");
            return Err(err.into());
        }

        batches.mark_voided(&mut tx, batch_id, now).await?;
        let released = self.db.time_entries().release_batch(&mut tx, batch_id, now).await?;
        tx.commit().await?;

        info!(batch_id = %batch_id, released, "Payroll batch voided");
        Ok(RevertConfirmation {
            batch_id: batch.id,
            state: BatchState::Voided,
            voided_at: now,
            released_entries: released,
        })
    }
}
