//! # Bonus Repository
//!
//! The bonus ledger and its audit trail.
//!
//! Bonuses are never deleted: removal stamps `removed_at`. Audit records
//! are insert-only (the schema rejects UPDATE and DELETE on them).

use chrono::{DateTime, Utc};
use nomina_core::{Bonus, BonusAuditRecord};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_BONUS: &str = r#"
    SELECT id, entry_id, amount_cents, reason, effective_date, recorded_at, removed_at
    FROM bonuses
"#;

const SELECT_AUDIT: &str = r#"
    SELECT id, bonus_id, entry_id, change, before_cents, after_cents, reason, actor, recorded_at
    FROM bonus_audit_records
"#;

/// Repository for the bonus ledger.
#[derive(Debug, Clone)]
pub struct BonusRepository {
    pool: SqlitePool,
}

impl BonusRepository {
    /// Creates a new BonusRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BonusRepository { pool }
    }

    /// Gets a bonus by ID (removed bonuses included).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bonus>> {
        let sql = format!("{} WHERE id = ?1", SELECT_BONUS);
        let bonus = sqlx::query_as::<_, Bonus>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bonus)
    }

    /// Gets a bonus by ID on the caller's transaction.
    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bonus>> {
        let sql = format!("{} WHERE id = ?1", SELECT_BONUS);
        let bonus = sqlx::query_as::<_, Bonus>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(bonus)
    }

    /// Records a new bonus.
    pub async fn insert(&self, conn: &mut SqliteConnection, bonus: &Bonus) -> DbResult<()> {
        debug!(id = %bonus.id, entry_id = %bonus.entry_id, amount = bonus.amount_cents, "Inserting bonus");

        sqlx::query(
            r#"
            INSERT INTO bonuses (
                id, entry_id, amount_cents, reason, effective_date, recorded_at, removed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&bonus.id)
        .bind(&bonus.entry_id)
        .bind(bonus.amount_cents)
        .bind(&bonus.reason)
        .bind(bonus.effective_date)
        .bind(bonus.recorded_at)
        .bind(bonus.removed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Changes the amount of a bonus that has not been removed.
    pub async fn update_amount(&self, conn: &mut SqliteConnection, id: &str, amount_cents: i64) -> DbResult<()> {
        debug!(id = %id, amount = amount_cents, "Updating bonus amount");

        let result = sqlx::query("UPDATE bonuses SET amount_cents = ?2 WHERE id = ?1 AND removed_at IS NULL")
            .bind(id)
            .bind(amount_cents)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::conflict("Bonus", id));
        }

        Ok(())
    }

    /// Soft-deletes a bonus.
    pub async fn mark_removed(&self, conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "Removing bonus");

        let result = sqlx::query("UPDATE bonuses SET removed_at = ?2 WHERE id = ?1 AND removed_at IS NULL")
            .bind(id)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::conflict("Bonus", id));
        }

        Ok(())
    }

    /// Sum of the live (not removed) bonuses of an entry, on the caller's
    /// transaction.
    pub async fn active_total_in(&self, conn: &mut SqliteConnection, entry_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM bonuses WHERE entry_id = ?1 AND removed_at IS NULL",
        )
        .bind(entry_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total)
    }

    /// Every bonus recorded on an entry, oldest first.
    pub async fn list_for_entry(&self, entry_id: &str, include_removed: bool) -> DbResult<Vec<Bonus>> {
        let sql = if include_removed {
            format!("{} WHERE entry_id = ?1 ORDER BY recorded_at, id", SELECT_BONUS)
        } else {
            format!(
                "{} WHERE entry_id = ?1 AND removed_at IS NULL ORDER BY recorded_at, id",
                SELECT_BONUS
            )
        };

        let bonuses = sqlx::query_as::<_, Bonus>(&sql)
            .bind(entry_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bonuses)
    }

    /// Appends an audit record.
    pub async fn insert_audit(&self, conn: &mut SqliteConnection, record: &BonusAuditRecord) -> DbResult<()> {
        debug!(
            bonus_id = %record.bonus_id,
            change = ?record.change,
            before = record.before_cents,
            after = record.after_cents,
            "Writing bonus audit record"
        );

        sqlx::query(
            r#"
            INSERT INTO bonus_audit_records (
                id, bonus_id, entry_id, change, before_cents, after_cents, reason, actor, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.bonus_id)
        .bind(&record.entry_id)
        .bind(record.change)
        .bind(record.before_cents)
        .bind(record.after_cents)
        .bind(&record.reason)
        .bind(&record.actor)
        .bind(record.recorded_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Audit trail of an entry, oldest first.
    pub async fn audit_for_entry(&self, entry_id: &str) -> DbResult<Vec<BonusAuditRecord>> {
        let sql = format!("{} WHERE entry_id = ?1 ORDER BY recorded_at, rowid", SELECT_AUDIT);
        let records = sqlx::query_as::<_, BonusAuditRecord>(&sql)
            .bind(entry_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Audit trail of a single bonus, oldest first.
    pub async fn audit_for_bonus(&self, bonus_id: &str) -> DbResult<Vec<BonusAuditRecord>> {
        let sql = format!("{} WHERE bonus_id = ?1 ORDER BY recorded_at, rowid", SELECT_AUDIT);
        let records = sqlx::query_as::<_, BonusAuditRecord>(&sql)
            .bind(bonus_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
