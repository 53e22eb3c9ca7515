//! # Bonus Ledger
//!
//! Append-only bonus awards on a time entry. Each change is one
//! transaction of three writes:
//!
//! ```text
//!   bonuses row (insert / new amount / removed_at)
//!   bonus_audit_records row (before → after, actor, reason)
//!   time_entries.bonus_total_cents (versioned update)
//! ```
//!
//! A processed entry rejects all three before anything is written.

use chrono::{NaiveDate, Utc};
use nomina_core::validation::{self, validate_actor, validate_id, validate_note};
use nomina_core::{payroll, Bonus, BonusAuditRecord, BonusChange, CoreError, Money, TimeEntry, ValidationError};
use nomina_db::Database;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::rejected;
use crate::error::{PayrollError, PayrollResult};

/// `AddBonus` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBonusRequest {
    pub entry_id: String,
    pub amount_cents: i64,
    pub reason: String,
    pub actor: String,
    /// Defaults to the day the bonus is recorded.
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

/// `EditBonus` command. The reason explains the edit and lands on the
/// audit record; the bonus keeps its original reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBonusRequest {
    pub bonus_id: String,
    pub amount_cents: i64,
    pub reason: String,
    pub actor: String,
}

/// `RemoveBonus` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBonusRequest {
    pub bonus_id: String,
    pub actor: String,
}

/// A bonus award after validation.
pub(crate) struct NewBonus {
    pub amount: Money,
    pub reason: String,
    pub actor: String,
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct BonusLedger {
    db: Database,
}

impl BonusLedger {
    pub fn new(db: Database) -> Self {
        BonusLedger { db }
    }

    /// Awards a bonus on an unlocked entry.
    pub async fn add_bonus(&self, request: AddBonusRequest) -> PayrollResult<Bonus> {
        validate_id("entry_id", &request.entry_id)?;
        let award = NewBonus::validate(
            request.amount_cents,
            &request.reason,
            &request.actor,
            request.effective_date,
        )?;

        let mut tx = self.db.begin().await?;
        let mut entry = self
            .db
            .time_entries()
            .find_in(&mut tx, &request.entry_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("TimeEntry", &request.entry_id))?;

        let bonus = self.add_in(&mut tx, &mut entry, award).await?;
        tx.commit().await?;

        info!(
            bonus_id = %bonus.id,
            entry_id = %entry.id,
            amount = %bonus.amount(),
            bonus_total = %entry.bonus_total(),
            "Bonus added"
        );
        Ok(bonus)
    }

    /// Changes the amount of a live bonus.
    pub async fn edit_bonus(&self, request: EditBonusRequest) -> PayrollResult<Bonus> {
        validate_id("bonus_id", &request.bonus_id)?;
        let new_amount = Money::from_cents(request.amount_cents);
        validation::validate_positive("amount", new_amount)?;
        let reason = validate_note("reason", &request.reason)?;
        let actor = validate_actor(&request.actor)?;

        let now = Utc::now();
        let bonuses = self.db.bonuses();
        let mut tx = self.db.begin().await?;

        let (mut bonus, mut entry) = self.load_live(&mut tx, &request.bonus_id).await?;
        let before = bonus.amount();

        let delta = new_amount.checked_sub(before).ok_or_else(|| {
            PayrollError::from(ValidationError::Overflow {
                field: "amount".to_string(),
            })
        })?;
        payroll::apply_bonus_delta(&mut entry, delta, now).map_err(|e| rejected(&bonus.entry_id, e))?;

        bonuses.update_amount(&mut tx, &bonus.id, new_amount.cents()).await?;
        bonuses
            .insert_audit(
                &mut tx,
                &audit_record(&bonus, BonusChange::Edited, before, new_amount, reason, actor, now),
            )
            .await?;
        self.db.time_entries().update(&mut tx, &mut entry).await?;
        tx.commit().await?;

        bonus.amount_cents = new_amount.cents();
        info!(
            bonus_id = %bonus.id,
            entry_id = %entry.id,
            before = %before,
            after = %new_amount,
            "Bonus edited"
        );
        Ok(bonus)
    }

    /// Soft-deletes a bonus and takes it out of the entry's total.
    pub async fn remove_bonus(&self, request: RemoveBonusRequest) -> PayrollResult<Bonus> {
        validate_id("bonus_id", &request.bonus_id)?;
        let actor = validate_actor(&request.actor)?;

        let now = Utc::now();
        let bonuses = self.db.bonuses();
        let mut tx = self.db.begin().await?;

        let (mut bonus, mut entry) = self.load_live(&mut tx, &request.bonus_id).await?;
        let before = bonus.amount();

        payroll::apply_bonus_delta(&mut entry, -before, now).map_err(|e| rejected(&bonus.entry_id, e))?;

        bonuses.mark_removed(&mut tx, &bonus.id, now).await?;
        let reason = bonus.reason.clone();
        bonuses
            .insert_audit(
                &mut tx,
                &audit_record(&bonus, BonusChange::Removed, before, Money::zero(), reason, actor, now),
            )
            .await?;
        self.db.time_entries().update(&mut tx, &mut entry).await?;
        tx.commit().await?;

        bonus.removed_at = Some(now);
        info!(bonus_id = %bonus.id, entry_id = %entry.id, amount = %before, "Bonus removed");
        Ok(bonus)
    }

    /// Adds a bonus to `entry` on an open transaction.
    ///
    /// Writes the bonus, its `Added` audit record and the entry's new total.
    /// The caller commits.
    pub(crate) async fn add_in(
        &self,
        conn: &mut SqliteConnection,
        entry: &mut TimeEntry,
        award: NewBonus,
    ) -> PayrollResult<Bonus> {
        let now = Utc::now();
        payroll::apply_bonus_delta(entry, award.amount, now).map_err(|e| rejected(&entry.id, e))?;

        let bonus = Bonus {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            amount_cents: award.amount.cents(),
            reason: award.reason,
            effective_date: award.effective_date.unwrap_or_else(|| now.date_naive()),
            recorded_at: now,
            removed_at: None,
        };

        let bonuses = self.db.bonuses();
        bonuses.insert(&mut *conn, &bonus).await?;
        let reason = bonus.reason.clone();
        bonuses
            .insert_audit(
                &mut *conn,
                &audit_record(&bonus, BonusChange::Added, Money::zero(), award.amount, reason, award.actor, now),
            )
            .await?;
        self.db.time_entries().update(&mut *conn, entry).await?;

        Ok(bonus)
    }

    /// Loads a bonus that has not been removed, plus its entry.
    async fn load_live(&self, conn: &mut SqliteConnection, bonus_id: &str) -> PayrollResult<(Bonus, TimeEntry)> {
        let bonus = self
            .db
            .bonuses()
            .find_in(&mut *conn, bonus_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("Bonus", bonus_id))?;

        if bonus.is_removed() {
            return Err(rejected(&bonus.entry_id, CoreError::BonusAlreadyRemoved(bonus.id.clone())));
        }

        let entry = self
            .db
            .time_entries()
            .find_in(&mut *conn, &bonus.entry_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("TimeEntry", &bonus.entry_id))?;

        Ok((bonus, entry))
    }
}

impl NewBonus {
    pub(crate) fn validate(
        amount_cents: i64,
        reason: &str,
        actor: &str,
        effective_date: Option<NaiveDate>,
    ) -> PayrollResult<Self> {
        let amount = Money::from_cents(amount_cents);
        validation::validate_positive("amount", amount)?;

        Ok(NewBonus {
            amount,
            reason: validate_note("reason", reason)?,
            actor: validate_actor(actor)?,
            effective_date,
        })
    }
}

fn audit_record(
    bonus: &Bonus,
    change: BonusChange,
    before: Money,
    after: Money,
    reason: String,
    actor: String,
    now: chrono::DateTime<Utc>,
) -> BonusAuditRecord {
    BonusAuditRecord {
        id: Uuid::new_v4().to_string(),
        bonus_id: bonus.id.clone(),
        entry_id: bonus.entry_id.clone(),
        change,
        before_cents: before.cents(),
        after_cents: after.cents(),
        reason,
        actor,
        recorded_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;

    fn add(entry_id: &str, cents: i64) -> AddBonusRequest {
        AddBonusRequest {
            entry_id: entry_id.to_string(),
            amount_cents: cents,
            reason: "Quarterly target".to_string(),
            actor: "payroll.office".to_string(),
            effective_date: None,
        }
    }

    #[tokio::test]
    async fn test_add_edit_remove_keep_total_and_audit() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let ledger = engine.bonuses();

        let first = ledger.add_bonus(add(&entry.id, 10_000_00)).await.unwrap();
        let second = ledger.add_bonus(add(&entry.id, 2_500_00)).await.unwrap();

        let stored = engine.query().get_entry(&entry.id).await.unwrap();
        assert_eq!(stored.bonus_total_cents, 12_500_00);
        assert_eq!(stored.gross_pay().cents(), 36_000_00 + 12_500_00);

        let edited = ledger
            .edit_bonus(EditBonusRequest {
                bonus_id: first.id.clone(),
                amount_cents: 7_000_00,
                reason: "Target partly met".to_string(),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(edited.amount_cents, 7_000_00);
        assert_eq!(edited.reason, "Quarterly target");

        ledger
            .remove_bonus(RemoveBonusRequest {
                bonus_id: second.id.clone(),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap();

        let stored = engine.query().get_entry(&entry.id).await.unwrap();
        assert_eq!(stored.bonus_total_cents, 7_000_00);

        let mut tx = engine.database().begin().await.unwrap();
        let ledger_total = engine.database().bonuses().active_total_in(&mut tx, &entry.id).await.unwrap();
        drop(tx);
        assert_eq!(ledger_total, stored.bonus_total_cents);

        let audit = engine.query().entry_audit(&entry.id).await.unwrap();
        let changes: Vec<(BonusChange, i64, i64)> =
            audit.iter().map(|a| (a.change, a.before_cents, a.after_cents)).collect();
        assert_eq!(
            changes,
            vec![
                (BonusChange::Added, 0, 10_000_00),
                (BonusChange::Added, 0, 2_500_00),
                (BonusChange::Edited, 10_000_00, 7_000_00),
                (BonusChange::Removed, 2_500_00, 0),
            ]
        );
        assert_eq!(audit[2].reason, "Target partly met");
        assert_eq!(audit[3].reason, "Quarterly target");
    }

    #[tokio::test]
    async fn test_invalid_and_missing() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let ledger = engine.bonuses();

        let err = ledger.add_bonus(add(&entry.id, 0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut blank = add(&entry.id, 100);
        blank.reason = "   ".to_string();
        assert_eq!(ledger.add_bonus(blank).await.unwrap_err().code(), ErrorCode::ValidationError);

        let err = ledger.add_bonus(add("missing", 100)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = ledger
            .remove_bonus(RemoveBonusRequest {
                bonus_id: "missing".to_string(),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, PayrollError::not_found("Bonus", "missing"));
    }

    #[tokio::test]
    async fn test_oversized_bonus_rejected_and_generation_unaffected() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;

        let err = engine.bonuses().add_bonus(add(&entry.id, i64::MAX - 1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let batch = testing::generate_march(&engine).await;
        assert_eq!(batch.total_gross_cents, 36_000_00);
        assert!(engine.query().entry_audit(&entry.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removed_bonus_cannot_change_again() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let ledger = engine.bonuses();
        let bonus = ledger.add_bonus(add(&entry.id, 500_00)).await.unwrap();
        let remove = RemoveBonusRequest {
            bonus_id: bonus.id.clone(),
            actor: "payroll.office".to_string(),
        };

        ledger.remove_bonus(remove.clone()).await.unwrap();
        let err = ledger.remove_bonus(remove).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(engine.query().entry_audit(&entry.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_processed_entry_rejects_bonus_changes_without_side_effects() {
        let engine = testing::engine().await;
        let entry = testing::closed_entry(&engine, "emp-1", 2, 8, 4_500).await;
        let bonus = engine.bonuses().add_bonus(add(&entry.id, 1_000_00)).await.unwrap();
        testing::generate_march(&engine).await;

        let before = engine.query().get_entry(&entry.id).await.unwrap();
        let ledger = engine.bonuses();

        let err = ledger
            .edit_bonus(EditBonusRequest {
                bonus_id: bonus.id.clone(),
                amount_cents: 9_000_00,
                reason: "Late correction".to_string(),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err = ledger.add_bonus(add(&entry.id, 100)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err = ledger
            .remove_bonus(RemoveBonusRequest {
                bonus_id: bonus.id.clone(),
                actor: "payroll.office".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        assert_eq!(engine.query().get_entry(&entry.id).await.unwrap(), before);
        assert_eq!(engine.query().entry_audit(&entry.id).await.unwrap().len(), 1);
        let bonuses = engine.query().entry_bonuses(&entry.id, true).await.unwrap();
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].amount_cents, 1_000_00);
        assert!(bonuses[0].removed_at.is_none());
    }
}
