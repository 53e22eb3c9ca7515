//! # Batch Repository
//!
//! Payroll batches, their frozen lines, and the filtered batch search.
//!
//! ## Batch Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. GENERATE (one transaction, owned by the engine)                    │
//! │     └── insert()       → PayrollBatch { state: Generated }             │
//! │     └── insert_line()  → one BatchLine per member (never updated)      │
//! │                                                                         │
//! │  2. (OPTIONAL) VOID                                                    │
//! │     └── mark_voided()  → PayrollBatch { state: Voided, voided_at }     │
//! │         lines stay: they record what the voided batch paid             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use nomina_core::query::Pagination;
use nomina_core::{BatchLine, BatchState, PayrollBatch};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_BATCH: &str = r#"
    SELECT
        id, period_start, period_end, generated_at, state,
        total_gross_cents, total_deductions_cents, total_net_cents,
        entry_count, fiscal_year, comments, voided_at
    FROM payroll_batches
"#;

/// Filters for the batch search. All filters are conjunctive.
///
/// Employee filters match through the batch lines, so a voided batch is
/// still found by the employees it once paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilter {
    /// Batches whose period starts at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Batches whose period ends at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Implicit lower bound on the period start (from a period type).
    pub started_after: Option<DateTime<Utc>>,
    pub state: Option<BatchState>,
    pub employee_id: Option<String>,
    /// Any of these employees (resolved from a name/email search).
    /// `Some(vec![])` matches nothing.
    pub employee_ids: Option<Vec<String>>,
}

impl BatchFilter {
    fn matches_nothing(&self) -> bool {
        matches!(&self.employee_ids, Some(ids) if ids.is_empty())
    }
}

/// Repository for payroll batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PayrollBatch>> {
        let sql = format!("{} WHERE id = ?1", SELECT_BATCH);
        let batch = sqlx::query_as::<_, PayrollBatch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Gets a batch by ID on the caller's transaction.
    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PayrollBatch>> {
        let sql = format!("{} WHERE id = ?1", SELECT_BATCH);
        let batch = sqlx::query_as::<_, PayrollBatch>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(batch)
    }

    /// Inserts a new batch header.
    pub async fn insert(&self, conn: &mut SqliteConnection, batch: &PayrollBatch) -> DbResult<()> {
        debug!(id = %batch.id, entries = batch.entry_count, "Inserting payroll batch");

        sqlx::query(
            r#"
            INSERT INTO payroll_batches (
                id, period_start, period_end, generated_at, state,
                total_gross_cents, total_deductions_cents, total_net_cents,
                entry_count, fiscal_year, comments, voided_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12
            )
            "#,
        )
        .bind(&batch.id)
        .bind(batch.period_start)
        .bind(batch.period_end)
        .bind(batch.generated_at)
        .bind(batch.state)
        .bind(batch.total_gross_cents)
        .bind(batch.total_deductions_cents)
        .bind(batch.total_net_cents)
        .bind(batch.entry_count)
        .bind(batch.fiscal_year)
        .bind(&batch.comments)
        .bind(batch.voided_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the frozen figures of one member entry.
    pub async fn insert_line(&self, conn: &mut SqliteConnection, line: &BatchLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO batch_lines (
                batch_id, entry_id, employee_id, gross_cents,
                statutory_deductions_cents, income_tax_cents, net_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.batch_id)
        .bind(&line.entry_id)
        .bind(&line.employee_id)
        .bind(line.gross_cents)
        .bind(line.statutory_deductions_cents)
        .bind(line.income_tax_cents)
        .bind(line.net_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Voids a generated batch.
    ///
    /// Matches only a batch still in `generated`, so two concurrent
    /// reversals cannot both succeed.
    pub async fn mark_voided(&self, conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE payroll_batches SET state = 'voided', voided_at = ?2 WHERE id = ?1 AND state = 'generated'",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::conflict("PayrollBatch", id));
        }

        Ok(())
    }

    /// Lines of a batch, in entry order.
    pub async fn lines(&self, batch_id: &str) -> DbResult<Vec<BatchLine>> {
        let lines = sqlx::query_as::<_, BatchLine>(
            r#"
            SELECT
                batch_id, entry_id, employee_id, gross_cents,
                statutory_deductions_cents, income_tax_cents, net_cents
            FROM batch_lines
            WHERE batch_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Paginated batch search, most recently generated first.
    ///
    /// ## Returns
    /// The requested page and the total number of matching batches. No
    /// match is an empty page, not an error.
    pub async fn search(&self, filter: &BatchFilter, pagination: Pagination) -> DbResult<(Vec<PayrollBatch>, i64)> {
        debug!(?filter, page = pagination.page(), "Searching payroll batches");

        if filter.matches_nothing() {
            return Ok((Vec::new(), 0));
        }

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM payroll_batches WHERE 1 = 1");
        push_batch_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut page_query = QueryBuilder::<Sqlite>::new(SELECT_BATCH);
        page_query.push(" WHERE 1 = 1");
        push_batch_filters(&mut page_query, filter);
        page_query
            .push(" ORDER BY generated_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let batches = page_query
            .build_query_as::<PayrollBatch>()
            .fetch_all(&self.pool)
            .await?;

        Ok((batches, total))
    }
}

fn push_batch_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &BatchFilter) {
    if let Some(from) = filter.from {
        query.push(" AND period_start >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND period_end <= ").push_bind(to);
    }
    if let Some(lower) = filter.started_after {
        query.push(" AND period_start >= ").push_bind(lower);
    }
    if let Some(state) = filter.state {
        query.push(" AND state = ").push_bind(state);
    }
    if let Some(employee_id) = &filter.employee_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM batch_lines l WHERE l.batch_id = payroll_batches.id AND l.employee_id = ")
            .push_bind(employee_id.clone())
            .push(")");
    }
    if let Some(ids) = &filter.employee_ids {
        query.push(" AND EXISTS (SELECT 1 FROM batch_lines l WHERE l.batch_id = payroll_batches.id AND l.employee_id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated("))");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
