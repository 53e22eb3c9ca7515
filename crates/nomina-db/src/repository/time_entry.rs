//! # Time Entry Repository
//!
//! Database operations for time entries.
//!
//! ## Conditional Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every write names the version it read:                                │
//! │                                                                         │
//! │  update         WHERE id = ? AND version = ? AND state != 'processed'  │
//! │  lock_into_batch WHERE id = ? AND version = ? AND batch_id IS NULL     │
//! │                                                                         │
//! │  rows_affected == 1 → version + 1, caller continues                    │
//! │  rows_affected == 0 → DbError::Conflict, caller drops the transaction  │
//! │                                                                         │
//! │  Two generators racing for one entry: the second UPDATE matches no     │
//! │  row because batch_id is no longer NULL, so it rolls back whole.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use nomina_core::query::Pagination;
use nomina_core::{EntryState, TimeEntry};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_ENTRY: &str = r#"
    SELECT
        id, employee_id, period_start, period_end, hours_worked,
        hourly_rate_cents, overtime_hundredths, overtime_rate_cents,
        base_pay_cents, overtime_pay_cents, bonus_total_cents,
        statutory_deductions_cents, income_tax_cents, net_pay_cents,
        state, batch_id, version, created_at, updated_at
    FROM time_entries
"#;

/// Filters for the paginated entry search. All filters are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFilter {
    pub employee_id: Option<String>,
    pub state: Option<EntryState>,
    /// Entries starting at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Entries starting at or before this instant.
    pub to: Option<DateTime<Utc>>,
}

/// Repository for time entry database operations.
#[derive(Debug, Clone)]
pub struct TimeEntryRepository {
    pool: SqlitePool,
}

impl TimeEntryRepository {
    /// Creates a new TimeEntryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TimeEntryRepository { pool }
    }

    /// Gets an entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TimeEntry>> {
        let sql = format!("{} WHERE id = ?1", SELECT_ENTRY);
        let entry = sqlx::query_as::<_, TimeEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Gets an entry by ID on the caller's transaction.
    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TimeEntry>> {
        let sql = format!("{} WHERE id = ?1", SELECT_ENTRY);
        let entry = sqlx::query_as::<_, TimeEntry>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(entry)
    }

    /// Inserts a new entry.
    pub async fn insert(&self, conn: &mut SqliteConnection, entry: &TimeEntry) -> DbResult<()> {
        debug!(id = %entry.id, employee_id = %entry.employee_id, "Inserting time entry");

        sqlx::query(
            r#"
            INSERT INTO time_entries (
                id, employee_id, period_start, period_end, hours_worked,
                hourly_rate_cents, overtime_hundredths, overtime_rate_cents,
                base_pay_cents, overtime_pay_cents, bonus_total_cents,
                statutory_deductions_cents, income_tax_cents, net_pay_cents,
                state, batch_id, version, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19
            )
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.employee_id)
        .bind(entry.period_start)
        .bind(entry.period_end)
        .bind(entry.hours_worked)
        .bind(entry.hourly_rate_cents)
        .bind(entry.overtime_hundredths)
        .bind(entry.overtime_rate_cents)
        .bind(entry.base_pay_cents)
        .bind(entry.overtime_pay_cents)
        .bind(entry.bonus_total_cents)
        .bind(entry.statutory_deductions_cents)
        .bind(entry.income_tax_cents)
        .bind(entry.net_pay_cents)
        .bind(entry.state)
        .bind(&entry.batch_id)
        .bind(entry.version)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the editable fields of an unlocked entry.
    ///
    /// Matches only the version the caller read and only while the entry is
    /// not processed. On success `entry.version` is bumped to the stored
    /// value.
    pub async fn update(&self, conn: &mut SqliteConnection, entry: &mut TimeEntry) -> DbResult<()> {
        debug!(id = %entry.id, version = entry.version, "Updating time entry");

        let result = sqlx::query(
            r#"
            UPDATE time_entries SET
                period_start = ?1,
                period_end = ?2,
                hours_worked = ?3,
                hourly_rate_cents = ?4,
                overtime_hundredths = ?5,
                overtime_rate_cents = ?6,
                base_pay_cents = ?7,
                overtime_pay_cents = ?8,
                bonus_total_cents = ?9,
                state = ?10,
                updated_at = ?11,
                version = version + 1
            WHERE id = ?12 AND version = ?13 AND state != 'processed'
            "#,
        )
        .bind(entry.period_start)
        .bind(entry.period_end)
        .bind(entry.hours_worked)
        .bind(entry.hourly_rate_cents)
        .bind(entry.overtime_hundredths)
        .bind(entry.overtime_rate_cents)
        .bind(entry.base_pay_cents)
        .bind(entry.overtime_pay_cents)
        .bind(entry.bonus_total_cents)
        .bind(entry.state)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .bind(entry.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::conflict("TimeEntry", &entry.id));
        }

        entry.version += 1;
        Ok(())
    }

    /// Claims a completed entry for a batch and stores its figures.
    ///
    /// `entry` already carries the processed state, batch id and figures.
    /// The row is only claimed while `batch_id` is still NULL at the version
    /// the generator read.
    pub async fn lock_into_batch(&self, conn: &mut SqliteConnection, entry: &mut TimeEntry) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE time_entries SET
                statutory_deductions_cents = ?1,
                income_tax_cents = ?2,
                net_pay_cents = ?3,
                state = 'processed',
                batch_id = ?4,
                updated_at = ?5,
                version = version + 1
            WHERE id = ?6 AND version = ?7 AND batch_id IS NULL AND state = 'completed'
            "#,
        )
        .bind(entry.statutory_deductions_cents)
        .bind(entry.income_tax_cents)
        .bind(entry.net_pay_cents)
        .bind(&entry.batch_id)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .bind(entry.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::conflict("TimeEntry", &entry.id));
        }

        entry.version += 1;
        Ok(())
    }

    /// Releases every member of a batch back to `completed`, zeroing the
    /// figures computed at generation.
    ///
    /// ## Returns
    /// Number of entries released.
    pub async fn release_batch(
        &self,
        conn: &mut SqliteConnection,
        batch_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        debug!(batch_id = %batch_id, "Releasing batch members");

        let result = sqlx::query(
            r#"
            UPDATE time_entries SET
                batch_id = NULL,
                state = 'completed',
                statutory_deductions_cents = 0,
                income_tax_cents = 0,
                net_pay_cents = 0,
                updated_at = ?2,
                version = version + 1
            WHERE batch_id = ?1
            "#,
        )
        .bind(batch_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Unbatched entries inside a generation window, read on the caller's
    /// transaction.
    ///
    /// Returns both kinds the generator needs to see:
    /// - completed entries with `start <= period_start` and `period_end <= end`
    /// - incomplete entries whose `period_start` falls in `[start, end]`
    pub async fn unbatched_in_window(
        &self,
        conn: &mut SqliteConnection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<TimeEntry>> {
        let sql = format!(
            "{} WHERE batch_id IS NULL AND period_start >= ?1 \
             AND ((period_end IS NULL AND period_start <= ?2) OR period_end <= ?2) \
             ORDER BY period_start, id",
            SELECT_ENTRY
        );

        let entries = sqlx::query_as::<_, TimeEntry>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&mut *conn)
            .await?;

        debug!(count = entries.len(), "Loaded unbatched entries in window");
        Ok(entries)
    }

    /// Distinct employees with unbatched entries inside a generation window.
    pub async fn employees_in_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT employee_id
            FROM time_entries
            WHERE batch_id IS NULL AND period_start >= ?1
              AND ((period_end IS NULL AND period_start <= ?2) OR period_end <= ?2)
            ORDER BY employee_id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Entries currently locked into a batch.
    pub async fn members_of(&self, batch_id: &str) -> DbResult<Vec<TimeEntry>> {
        let sql = format!("{} WHERE batch_id = ?1 ORDER BY period_start, id", SELECT_ENTRY);
        let entries = sqlx::query_as::<_, TimeEntry>(&sql)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Paginated entry search, newest period first.
    ///
    /// ## Returns
    /// The requested page and the total number of matching entries.
    pub async fn search(&self, filter: &EntryFilter, pagination: Pagination) -> DbResult<(Vec<TimeEntry>, i64)> {
        debug!(?filter, page = pagination.page(), "Searching time entries");

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM time_entries WHERE 1 = 1");
        push_entry_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut page_query = QueryBuilder::<Sqlite>::new(SELECT_ENTRY);
        page_query.push(" WHERE 1 = 1");
        push_entry_filters(&mut page_query, filter);
        page_query
            .push(" ORDER BY period_start DESC, id LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let entries = page_query
            .build_query_as::<TimeEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok((entries, total))
    }
}

fn push_entry_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &EntryFilter) {
    if let Some(employee_id) = &filter.employee_id {
        query.push(" AND employee_id = ").push_bind(employee_id.clone());
    }
    if let Some(state) = filter.state {
        query.push(" AND state = ").push_bind(state);
    }
    if let Some(from) = filter.from {
        query.push(" AND period_start >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND period_start <= ").push_bind(to);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
