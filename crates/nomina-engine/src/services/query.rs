//! # Payroll Query
//!
//! Filtered, paginated reads over batches and entries, plus the snapshots
//! downstream reporting and export collaborators read. Nothing here
//! writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nomina_core::query::{Page, Pagination, PeriodType};
use nomina_core::validation::{validate_id, validate_period};
use nomina_core::{BatchLine, BatchState, Bonus, BonusAuditRecord, EntryState, PayrollBatch, TimeEntry};
use nomina_db::{BatchFilter, Database, EntryFilter};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::directory::EmployeeDirectory;
use crate::error::{PayrollError, PayrollResult};

/// `SearchBatches` command. Every filter is optional and they combine
/// conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchBatchesRequest {
    /// Batches whose period starts at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Batches whose period ends at or before this instant.
    pub to: Option<DateTime<Utc>>,
    pub employee_id: Option<String>,
    pub state: Option<BatchState>,
    pub period_type: Option<PeriodType>,
    /// Case-insensitive substring of an employee name or email.
    pub employee: Option<String>,
    /// 1-based; defaults to 1.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Paginated entry search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntrySearchRequest {
    pub employee_id: Option<String>,
    pub state: Option<EntryState>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// A batch with its frozen lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BatchDetail {
    pub batch: PayrollBatch,
    pub lines: Vec<BatchLine>,
}

/// An entry with its derived gross and its bonus ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EntryDetail {
    pub entry: TimeEntry,
    pub gross_pay_cents: i64,
    pub bonuses: Vec<Bonus>,
    pub audit: Vec<BonusAuditRecord>,
}

#[derive(Clone)]
pub struct PayrollQuery {
    db: Database,
    directory: Arc<dyn EmployeeDirectory>,
    default_page_size: u32,
    max_page_size: u32,
}

impl PayrollQuery {
    pub fn new(db: Database, directory: Arc<dyn EmployeeDirectory>, default_page_size: u32, max_page_size: u32) -> Self {
        PayrollQuery {
            db,
            directory,
            default_page_size,
            max_page_size,
        }
    }

    /// Searches batches, most recently generated first.
    ///
    /// No match is an empty page, never an error.
    pub async fn search_batches(&self, request: SearchBatchesRequest) -> PayrollResult<Page<PayrollBatch>> {
        let pagination = self.pagination(request.page, request.page_size)?;
        check_range(request.from, request.to)?;

        let employee_ids = match request.employee.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => Some(self.directory.matching_ids(needle).await?),
            _ => None,
        };

        let filter = BatchFilter {
            from: request.from,
            to: request.to,
            started_after: request.period_type.map(|p| p.lower_bound(Utc::now())),
            state: request.state,
            employee_id: non_blank(request.employee_id),
            employee_ids,
        };

        let (items, total) = self.db.batches().search(&filter, pagination).await?;
        Ok(Page::new(items, pagination, total))
    }

    /// Searches entries, latest period first.
    pub async fn search_entries(&self, request: EntrySearchRequest) -> PayrollResult<Page<TimeEntry>> {
        let pagination = self.pagination(request.page, request.page_size)?;
        check_range(request.from, request.to)?;

        let filter = EntryFilter {
            employee_id: non_blank(request.employee_id),
            state: request.state,
            from: request.from,
            to: request.to,
        };

        let (items, total) = self.db.time_entries().search(&filter, pagination).await?;
        Ok(Page::new(items, pagination, total))
    }

    pub async fn get_batch(&self, batch_id: &str) -> PayrollResult<PayrollBatch> {
        validate_id("batch_id", batch_id)?;
        self.db
            .batches()
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("PayrollBatch", batch_id))
    }

    /// Frozen lines of a batch, voided or not.
    pub async fn batch_lines(&self, batch_id: &str) -> PayrollResult<Vec<BatchLine>> {
        self.get_batch(batch_id).await?;
        Ok(self.db.batches().lines(batch_id).await?)
    }

    pub async fn batch_detail(&self, batch_id: &str) -> PayrollResult<BatchDetail> {
        let batch = self.get_batch(batch_id).await?;
        let lines = self.db.batches().lines(batch_id).await?;
        Ok(BatchDetail { batch, lines })
    }

    /// Entries currently locked into a batch.
    pub async fn batch_members(&self, batch_id: &str) -> PayrollResult<Vec<TimeEntry>> {
        self.get_batch(batch_id).await?;
        Ok(self.db.time_entries().members_of(batch_id).await?)
    }

    pub async fn get_entry(&self, entry_id: &str) -> PayrollResult<TimeEntry> {
        validate_id("entry_id", entry_id)?;
        self.db
            .time_entries()
            .get_by_id(entry_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("TimeEntry", entry_id))
    }

    pub async fn entry_bonuses(&self, entry_id: &str, include_removed: bool) -> PayrollResult<Vec<Bonus>> {
        self.get_entry(entry_id).await?;
        Ok(self.db.bonuses().list_for_entry(entry_id, include_removed).await?)
    }

    /// Audit trail of every bonus on an entry, oldest first.
    pub async fn entry_audit(&self, entry_id: &str) -> PayrollResult<Vec<BonusAuditRecord>> {
        self.get_entry(entry_id).await?;
        Ok(self.db.bonuses().audit_for_entry(entry_id).await?)
    }

    /// Audit trail of a single bonus.
    pub async fn bonus_audit(&self, bonus_id: &str) -> PayrollResult<Vec<BonusAuditRecord>> {
        validate_id("bonus_id", bonus_id)?;
        if self.db.bonuses().get_by_id(bonus_id).await?.is_none() {
            return Err(PayrollError::not_found("Bonus", bonus_id));
        }
        Ok(self.db.bonuses().audit_for_bonus(bonus_id).await?)
    }

    pub async fn entry_detail(&self, entry_id: &str) -> PayrollResult<EntryDetail> {
        let entry = self.get_entry(entry_id).await?;
        let bonuses = self.db.bonuses().list_for_entry(entry_id, true).await?;
        let audit = self.db.bonuses().audit_for_entry(entry_id).await?;

        Ok(EntryDetail {
            gross_pay_cents: entry.gross_pay().cents(),
            entry,
            bonuses,
            audit,
        })
    }

    fn pagination(&self, page: Option<u32>, page_size: Option<u32>) -> PayrollResult<Pagination> {
        Ok(Pagination::new(
            page.unwrap_or(1),
            page_size.unwrap_or(self.default_page_size),
            self.max_page_size,
        )?)
    }
}

fn check_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> PayrollResult<()> {
    if let Some(from) = from {
        validate_period("date_range", from, to)?;
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
