//! # Payroll Batch Generator
//!
//! Turns every completed, unbatched entry of a period into one batch.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  before begin()                                                         │
//! │    rates    = active statutory rates                                    │
//! │    schedule = TaxSchedule(brackets of year(periodEnd))   ── Validation  │
//! │    allowed  = active employees with entries in window (optional)        │
//! │                                                                         │
//! │  transaction                                                            │
//! │    window   = unbatched entries in [periodStart, periodEnd]             │
//! │    no completed entry          ──► NoEligibleEntries        (rollback)  │
//! │    any incomplete entry        ──► IncompleteEntriesPresent (rollback)  │
//! │    figures  = compute_figures(entry, rates, schedule) per entry         │
//! │    INSERT batch (totals = Σ figures)                                    │
//! │    per entry: UPDATE ... WHERE batch_id IS NULL AND version = v         │
//! │               INSERT batch line                                         │
//! │    commit                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The claim on each entry is conditional on `batch_id IS NULL`. A
//! concurrent generation that got there first makes the update match no
//! row, or makes SQLite refuse the write lock; both roll this run back as a
//! Conflict, so an entry is never claimed by two batches.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nomina_core::payroll::{self, EntryFigures, TaxSchedule};
use nomina_core::validation::{self, validate_note};
use nomina_core::{BatchLine, BatchState, CoreError, EntryState, PayrollBatch, StatutoryDeductionRate, TimeEntry};
use nomina_db::Database;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::EmployeeDirectory;
use crate::error::{PayrollError, PayrollResult};

/// `GenerateBatch` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBatchRequest {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(default)]
    pub active_employees_only: bool,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Clone)]
pub struct PayrollBatchGenerator {
    db: Database,
    directory: Arc<dyn EmployeeDirectory>,
}

impl PayrollBatchGenerator {
    pub fn new(db: Database, directory: Arc<dyn EmployeeDirectory>) -> Self {
        PayrollBatchGenerator { db, directory }
    }

    /// Generates a batch over a period and locks its entries.
    ///
    /// ## Errors
    /// - `Validation`: inverted period, no bracket table for the fiscal
    ///   year, no eligible entries, incomplete entries in the period
    /// - `Conflict`: a concurrent generation claimed one of the entries
    pub async fn generate(&self, request: GenerateBatchRequest) -> PayrollResult<PayrollBatch> {
        let (start, end) = (request.period_start, request.period_end);
        validation::validate_period("period", start, Some(end))?;
        let comments = match request.comments.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(validate_note("comments", text)?),
            _ => None,
        };

        let fiscal_year = payroll::fiscal_year_of(end);
        let config = self.db.deduction_config();
        let rates = config.active_rates().await?;
        let schedule = self.schedule_for(fiscal_year).await?;
        let allowed = if request.active_employees_only {
            Some(self.active_employees(start, end).await?)
        } else {
            None
        };

        let now = Utc::now();
        let entries = self.db.time_entries();
        let batches = self.db.batches();
        let mut tx = self.db.begin().await?;

        let (candidates, incomplete): (Vec<TimeEntry>, Vec<TimeEntry>) = entries
            .unbatched_in_window(&mut tx, start, end)
            .await?
            .into_iter()
            .filter(|e| allowed.as_ref().map_or(true, |ids| ids.contains(&e.employee_id)))
            .partition(|e| e.state == EntryState::Completed);

        if candidates.is_empty() {
            let err = CoreError::NoEligibleEntries {
                period_start: start.to_rfc3339(),
                period_end: end.to_rfc3339(),
            };
            warn!(error = %err, "Batch generation rejected");
            return Err(err.into());
        }
        if !incomplete.is_empty() {
            let err = CoreError::IncompleteEntriesPresent {
                count: incomplete.len(),
            };
            warn!(
                error = %err,
                entry_ids = ?incomplete.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
                "Batch generation rejected"
            );
            return Err(err.into());
        }

        let priced = price(candidates, &rates, &schedule)?;
        let totals = payroll::batch_totals(priced.iter().map(|(_, f)| f))?;

        let batch = PayrollBatch {
            id: Uuid::new_v4().to_string(),
            period_start: start,
            period_end: end,
            generated_at: now,
            state: BatchState::Generated,
            total_gross_cents: totals.gross.cents(),
            total_deductions_cents: totals.deductions.cents(),
            total_net_cents: totals.net.cents(),
            entry_count: totals.entry_count,
            fiscal_year,
            comments,
            voided_at: None,
        };
        batches.insert(&mut tx, &batch).await?;

        for (mut entry, figures) in priced {
            payroll::lock_entry(&mut entry, &batch.id, &figures, now)?;
            entries.lock_into_batch(&mut tx, &mut entry).await?;
            batches
                .insert_line(
                    &mut tx,
                    &BatchLine {
                        batch_id: batch.id.clone(),
                        entry_id: entry.id.clone(),
                        employee_id: entry.employee_id.clone(),
                        gross_cents: figures.gross.cents(),
                        statutory_deductions_cents: figures.statutory_deductions.cents(),
                        income_tax_cents: figures.income_tax.cents(),
                        net_cents: figures.net.cents(),
                    },
                )
                .await?;
        }

        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            fiscal_year,
            entries = batch.entry_count,
            gross = %batch.total_gross(),
            deductions = %batch.total_deductions(),
            net = %batch.total_net(),
            "Payroll batch generated"
        );
        Ok(batch)
    }

    /// Validated bracket table of a fiscal year.
    async fn schedule_for(&self, fiscal_year: i32) -> PayrollResult<TaxSchedule> {
        let brackets = self.db.deduction_config().tax_brackets(fiscal_year).await?;
        if brackets.is_empty() {
            return Err(PayrollError::validation(format!(
                "No tax bracket table configured for fiscal year {}",
                fiscal_year
            )));
        }
        Ok(TaxSchedule::new(brackets)?)
    }

    /// Employees with entries in the window that the directory reports active.
    async fn active_employees(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PayrollResult<HashSet<String>> {
        let mut active = HashSet::new();
        for employee_id in self.db.time_entries().employees_in_window(start, end).await? {
            if self.directory.is_active(&employee_id).await? {
                active.insert(employee_id);
            } else {
                debug!(employee_id = %employee_id, "Skipping inactive employee");
            }
        }
        Ok(active)
    }
}

/// Computes deductions, tax and net for each candidate.
fn price(
    candidates: Vec<TimeEntry>,
    rates: &[StatutoryDeductionRate],
    schedule: &TaxSchedule,
) -> PayrollResult<Vec<(TimeEntry, EntryFigures)>> {
    candidates
        .into_iter()
        .map(|entry| match payroll::compute_figures(&entry, rates, schedule) {
            Ok(figures) => Ok((entry, figures)),
            Err(err) => {
                warn!(entry_id = %entry.id, error = %err, "Entry cannot be priced");
                Err(err.into())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::RegisterHoursRequest;
    use crate::testing::{self, at};
    use crate::PayrollEngine;
    use nomina_core::Money;

    fn march() -> GenerateBatchRequest {
        GenerateBatchRequest {
            period_start: at(3, 1, 0),
            period_end: at(3, 31, 23),
            active_employees_only: false,
            comments: Some("  March payroll  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_generate_locks_entries_and_totals_match() {
        let engine = testing::engine().await;
        let small = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let large = testing::closed_entry(&engine, "emp-2", 3, 8, 200_000).await;

        let batch = engine.generator().generate(march()).await.unwrap();

        assert_eq!(batch.state, BatchState::Generated);
        assert_eq!(batch.entry_count, 2);
        assert_eq!(batch.fiscal_year, 2026);
        assert_eq!(batch.comments.as_deref(), Some("March payroll"));

        // 36,000 gross: 10.5% statutory, below the first taxed bracket
        let small = engine.query().get_entry(&small.id).await.unwrap();
        assert_eq!(small.statutory_deductions().cents(), 3_780_00);
        assert_eq!(small.income_tax(), Money::zero());
        assert_eq!(small.net_pay().cents(), 32_220_00);

        // 1,600,000 gross: 168,000 statutory, 1,432,000 taxable
        // tax = 44,100 + (1,432,000 − 1,363,000) × 15% = 54,450
        let large = engine.query().get_entry(&large.id).await.unwrap();
        assert_eq!(large.statutory_deductions().cents(), 168_000_00);
        assert_eq!(large.income_tax().cents(), 54_450_00);
        assert_eq!(large.net_pay().cents(), 1_377_550_00);

        let members = [&small, &large];
        for entry in members {
            assert_eq!(entry.state, EntryState::Processed);
            assert_eq!(entry.batch_id.as_deref(), Some(batch.id.as_str()));
        }
        assert_eq!(
            batch.total_gross_cents,
            members.iter().map(|e| e.gross_pay().cents()).sum::<i64>()
        );
        assert_eq!(
            batch.total_deductions_cents,
            members.iter().map(|e| e.total_deductions().cents()).sum::<i64>()
        );
        assert_eq!(batch.total_net_cents, members.iter().map(|e| e.net_pay().cents()).sum::<i64>());

        let lines = engine.query().batch_lines(&batch.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.iter().map(|l| l.net_cents).sum::<i64>(), batch.total_net_cents);
    }

    #[tokio::test]
    async fn test_incomplete_entry_blocks_whole_batch() {
        let engine = testing::engine().await;
        let closed = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let open = testing::open_entry(&engine, "emp-2", 4).await;

        let err = engine.generator().generate(march()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("1 incomplete"));

        let closed_after = engine.query().get_entry(&closed.id).await.unwrap();
        assert_eq!(closed_after.state, EntryState::Completed);
        assert!(closed_after.batch_id.is_none());
        assert_eq!(closed_after.version, closed.version);
        assert_eq!(engine.query().get_entry(&open.id).await.unwrap().state, EntryState::Incomplete);
        assert!(testing::all_batches(&engine).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_period_and_missing_schedule() {
        let engine = testing::engine().await;

        let err = engine.generator().generate(march()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("No eligible entries"));

        let next_year = GenerateBatchRequest {
            period_start: at(3, 1, 0),
            period_end: at(3, 1, 0) + chrono::Duration::days(366),
            active_employees_only: false,
            comments: None,
        };
        let err = engine.generator().generate(next_year).await.unwrap_err();
        assert!(err.to_string().contains("fiscal year 2027"));

        let inverted = GenerateBatchRequest {
            period_start: at(3, 31, 0),
            period_end: at(3, 1, 0),
            active_employees_only: false,
            comments: None,
        };
        assert_eq!(
            engine.generator().generate(inverted).await.unwrap_err().code(),
            ErrorCode::ValidationError
        );
    }

    #[tokio::test]
    async fn test_window_bounds_and_already_batched() {
        let engine = testing::engine().await;
        let inside = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        // Ends after the window closes
        let spill = engine
            .recorder()
            .register_hours(RegisterHoursRequest {
                entry_id: None,
                employee_id: "emp-2".to_string(),
                period_start: at(3, 31, 20),
                period_end: Some(at(4, 1, 4)),
                hourly_rate_cents: 3_800_00,
            })
            .await
            .unwrap();

        let batch = engine.generator().generate(march()).await.unwrap();
        assert_eq!(batch.entry_count, 1);
        let member = engine.query().get_entry(&inside.id).await.unwrap();
        assert_eq!(member.batch_id, Some(batch.id));
        assert_eq!(engine.query().get_entry(&spill.id).await.unwrap().state, EntryState::Completed);

        // Everything in March is already batched now
        let err = engine.generator().generate(march()).await.unwrap_err();
        assert!(err.to_string().contains("No eligible entries"));
    }

    #[tokio::test]
    async fn test_active_employees_only() {
        let engine = testing::engine().await;
        let active = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let inactive = testing::closed_entry(&engine, "emp-3", 2, 8, 6_200).await;
        // The inactive employee's open entry is out of scope too
        testing::open_entry(&engine, "emp-3", 5).await;

        let mut request = march();
        request.active_employees_only = true;
        let batch = engine.generator().generate(request).await.unwrap();

        assert_eq!(batch.entry_count, 1);
        assert_eq!(engine.query().get_entry(&active.id).await.unwrap().state, EntryState::Processed);
        assert_eq!(engine.query().get_entry(&inactive.id).await.unwrap().state, EntryState::Completed);
    }

    #[tokio::test]
    async fn test_unrepresentable_gross_fails_without_side_effects() {
        let engine = testing::engine().await;
        let fine = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;

        // A row written outside the payroll operations
        let mut broken = TimeEntry::new(Uuid::new_v4().to_string(), "emp-2", at(3, 3, 8), at(3, 3, 8));
        broken.period_end = Some(at(3, 3, 16));
        broken.state = EntryState::Completed;
        broken.base_pay_cents = i64::MAX;
        broken.bonus_total_cents = 1;
        let mut tx = engine.database().begin().await.unwrap();
        engine.database().time_entries().insert(&mut tx, &broken).await.unwrap();
        tx.commit().await.unwrap();

        let err = engine.generator().generate(march()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("gross_pay"));
        assert!(testing::all_batches(&engine).await.is_empty());
        let fine_after = engine.query().get_entry(&fine.id).await.unwrap();
        assert_eq!(fine_after.state, EntryState::Completed);
        assert!(fine_after.batch_id.is_none());
    }

    async fn assert_single_winner(engine: &PayrollEngine, entry_ids: &[String]) {
        let (first, second) = (engine.generator(), engine.generator());
        let (a, b) = tokio::join!(first.generate(march()), second.generate(march()));

        let winners: Vec<&PayrollBatch> = [&a, &b].into_iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "results: {:?} / {:?}", a.as_ref().err(), b.as_ref().err());
        for loser in [&a, &b].into_iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                loser.code(),
                ErrorCode::Conflict | ErrorCode::ValidationError
            ));
        }

        for id in entry_ids {
            let entry = engine.query().get_entry(id).await.unwrap();
            assert_eq!(entry.batch_id.as_deref(), Some(winners[0].id.as_str()));
        }
        assert_eq!(testing::all_batches(engine).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_generation_single_connection() {
        let engine = testing::engine().await;
        let ids = vec![
            testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await.id,
            testing::closed_entry(&engine, "emp-2", 3, 8, 3_800).await.id,
        ];

        assert_single_winner(&engine, &ids).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_generation_file_database() {
        let path = std::env::temp_dir().join(format!("nomina-{}.db", Uuid::new_v4()));
        let engine = testing::engine_at(&path).await;
        let mut ids = Vec::new();
        for day in 2..8 {
            ids.push(testing::closed_entry(&engine, "emp-1", day, 8, 4_500).await.id);
            ids.push(testing::closed_entry(&engine, "emp-2", day, 8, 3_800).await.id);
        }

        assert_single_winner(&engine, &ids).await;

        engine.database().close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
