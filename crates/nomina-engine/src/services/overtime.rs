//! # Overtime Adjuster
//!
//! Sets the overtime of an entry within the legal cap. Overtime pay is its
//! own stored component, so re-applying overtime replaces the old value
//! instead of stacking on top of it.

use chrono::Utc;
use nomina_core::validation::{self, validate_id};
use nomina_core::{payroll, Hours, Money, TimeEntry};
use nomina_db::Database;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use super::bonus::{BonusLedger, NewBonus};
use super::rejected;
use crate::error::{PayrollError, PayrollResult};

/// `ApplyOvertime` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOvertimeRequest {
    pub entry_id: String,
    /// Overtime in hundredths of an hour (`150` = 1.5 h).
    pub overtime_hundredths: i64,
    /// Defaults to time and a half of the entry's hourly rate.
    #[serde(default)]
    pub overtime_rate_cents: Option<i64>,
}

/// `ApplyOvertimeAndBonus` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOvertimeAndBonusRequest {
    pub entry_id: String,
    pub overtime_hundredths: i64,
    #[serde(default)]
    pub overtime_rate_cents: Option<i64>,
    /// No bonus is recorded when zero.
    #[serde(default)]
    pub bonus_amount_cents: i64,
    /// Reason of the bonus; required when a bonus is given.
    #[serde(default)]
    pub notes: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct OvertimeAdjuster {
    db: Database,
    ledger: BonusLedger,
}

impl OvertimeAdjuster {
    pub fn new(db: Database) -> Self {
        let ledger = BonusLedger::new(db.clone());
        OvertimeAdjuster { db, ledger }
    }

    /// Replaces the overtime of an unlocked entry.
    pub async fn apply_overtime(&self, request: ApplyOvertimeRequest) -> PayrollResult<TimeEntry> {
        validate_id("entry_id", &request.entry_id)?;
        let hours = Hours::from_hundredths(request.overtime_hundredths);
        let rate = validate_rate(request.overtime_rate_cents)?;
        validation::validate_overtime(hours)?;

        let mut tx = self.db.begin().await?;
        let mut entry = self.load(&mut tx, &request.entry_id).await?;
        self.apply_in(&mut tx, &mut entry, hours, rate).await?;
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            overtime = %entry.overtime(),
            overtime_pay = %entry.overtime_pay(),
            "Overtime applied"
        );
        Ok(entry)
    }

    /// Applies overtime and, for a positive amount, a bonus in one
    /// transaction. Either both land or neither does.
    pub async fn apply_overtime_and_bonus(&self, request: ApplyOvertimeAndBonusRequest) -> PayrollResult<TimeEntry> {
        validate_id("entry_id", &request.entry_id)?;
        let hours = Hours::from_hundredths(request.overtime_hundredths);
        let rate = validate_rate(request.overtime_rate_cents)?;
        validation::validate_overtime(hours)?;
        validation::validate_amount("bonus_amount", Money::from_cents(request.bonus_amount_cents))?;

        let award = if request.bonus_amount_cents > 0 {
            let notes = request.notes.as_deref().unwrap_or_default();
            Some(NewBonus::validate(request.bonus_amount_cents, notes, &request.actor, None)?)
        } else {
            None
        };

        let mut tx = self.db.begin().await?;
        let mut entry = self.load(&mut tx, &request.entry_id).await?;
        self.apply_in(&mut tx, &mut entry, hours, rate).await?;
        let bonus = match award {
            Some(award) => Some(self.ledger.add_in(&mut tx, &mut entry, award).await?),
            None => None,
        };
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            overtime = %entry.overtime(),
            bonus_id = bonus.as_ref().map(|b| b.id.as_str()).unwrap_or("-"),
            gross = %entry.gross_pay(),
            "Overtime and bonus applied"
        );
        Ok(entry)
    }

    /// Applies overtime to `entry` on an open transaction; the caller commits.
    pub(crate) async fn apply_in(
        &self,
        conn: &mut SqliteConnection,
        entry: &mut TimeEntry,
        hours: Hours,
        rate: Option<Money>,
    ) -> PayrollResult<()> {
        let rate = rate.unwrap_or_else(|| payroll::default_overtime_rate(entry.hourly_rate()));
        payroll::apply_overtime(entry, hours, rate, Utc::now()).map_err(|e| rejected(&entry.id, e))?;
        self.db.time_entries().update(conn, entry).await?;
        Ok(())
    }

    async fn load(&self, conn: &mut SqliteConnection, entry_id: &str) -> PayrollResult<TimeEntry> {
        self.db
            .time_entries()
            .find_in(conn, entry_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("TimeEntry", entry_id))
    }
}

fn validate_rate(cents: Option<i64>) -> PayrollResult<Option<Money>> {
    match cents {
        Some(cents) => {
            let rate = Money::from_cents(cents);
            validation::validate_amount("overtime_rate", rate)?;
            Ok(Some(rate))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;

    fn overtime(entry_id: &str, hundredths: i64, rate: Option<i64>) -> ApplyOvertimeRequest {
        ApplyOvertimeRequest {
            entry_id: entry_id.to_string(),
            overtime_hundredths: hundredths,
            overtime_rate_cents: rate,
        }
    }

    #[tokio::test]
    async fn test_overtime_replaces_previous_value() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let adjuster = engine.overtime();

        let first = adjuster.apply_overtime(overtime(&entry.id, 300, Some(7_000_00))).await.unwrap();
        assert_eq!(first.overtime_pay().cents(), 21_000_00);
        assert_eq!(first.gross_pay().cents(), 36_000_00 + 21_000_00);

        let second = adjuster.apply_overtime(overtime(&entry.id, 150, Some(7_000_00))).await.unwrap();
        assert_eq!(second.overtime_pay().cents(), 10_500_00);
        assert_eq!(second.gross_pay().cents(), 36_000_00 + 10_500_00);

        let cleared = adjuster.apply_overtime(overtime(&entry.id, 0, None)).await.unwrap();
        assert_eq!(cleared.gross_pay(), cleared.base_pay());
    }

    #[tokio::test]
    async fn test_default_rate_is_time_and_a_half() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;

        let updated = engine.overtime().apply_overtime(overtime(&entry.id, 200, None)).await.unwrap();

        assert_eq!(updated.overtime_rate_cents, 6_750_00);
        assert_eq!(updated.overtime_pay().cents(), 13_500_00);
    }

    #[tokio::test]
    async fn test_cap_and_negative_rejected() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let adjuster = engine.overtime();

        let err = adjuster.apply_overtime(overtime(&entry.id, 401, None)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = adjuster.apply_overtime(overtime(&entry.id, -50, None)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = adjuster.apply_overtime(overtime(&entry.id, 100, Some(-1))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        assert!(adjuster.apply_overtime(overtime(&entry.id, 400, None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_processed_entry_rejects_overtime() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        testing::generate_march(&engine).await;
        let before = engine.query().get_entry(&entry.id).await.unwrap();

        let err = engine.overtime().apply_overtime(overtime(&entry.id, 100, None)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(engine.query().get_entry(&entry.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_overtime_and_bonus_together() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-2", 3, 8, 3_800).await;

        let updated = engine
            .overtime()
            .apply_overtime_and_bonus(ApplyOvertimeAndBonusRequest {
                entry_id: entry.id.clone(),
                overtime_hundredths: 100,
                overtime_rate_cents: Some(5_000_00),
                bonus_amount_cents: 2_000_00,
                notes: Some("Weekend inventory".to_string()),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(updated.gross_pay().cents(), 30_400_00 + 5_000_00 + 2_000_00);
        let bonuses = engine.query().entry_bonuses(&entry.id, false).await.unwrap();
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].reason, "Weekend inventory");

        let stored = engine.query().get_entry(&entry.id).await.unwrap();
        assert_eq!(stored.version, updated.version);
        assert_eq!(stored.bonus_total_cents, 2_000_00);
    }

    #[tokio::test]
    async fn test_overtime_and_bonus_is_all_or_nothing() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-2", 3, 8, 3_800).await;

        // Bonus without a reason fails before anything is written
        let err = engine
            .overtime()
            .apply_overtime_and_bonus(ApplyOvertimeAndBonusRequest {
                entry_id: entry.id.clone(),
                overtime_hundredths: 100,
                overtime_rate_cents: None,
                bonus_amount_cents: 2_000_00,
                notes: None,
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let stored = engine.query().get_entry(&entry.id).await.unwrap();
        assert_eq!(stored.overtime_hundredths, 0);
        assert!(engine.query().entry_bonuses(&entry.id, true).await.unwrap().is_empty());

        // Zero bonus records overtime only
        let updated = engine
            .overtime()
            .apply_overtime_and_bonus(ApplyOvertimeAndBonusRequest {
                entry_id: entry.id.clone(),
                overtime_hundredths: 100,
                overtime_rate_cents: None,
                bonus_amount_cents: 0,
                notes: None,
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(updated.overtime_hundredths, 100);
        assert!(engine.query().entry_bonuses(&entry.id, true).await.unwrap().is_empty());
    }
}
