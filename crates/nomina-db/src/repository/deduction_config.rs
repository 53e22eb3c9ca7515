//! # Deduction Configuration Repository
//!
//! Statutory deduction rates and the progressive bracket tables. The engine
//! only reads these; the insert methods exist for the seed binary and tests.

use nomina_core::{StatutoryDeductionRate, TaxBracket};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the read-only deduction configuration.
#[derive(Debug, Clone)]
pub struct DeductionConfigRepository {
    pool: SqlitePool,
}

impl DeductionConfigRepository {
    /// Creates a new DeductionConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeductionConfigRepository { pool }
    }

    /// Statutory rates flagged active.
    pub async fn active_rates(&self) -> DbResult<Vec<StatutoryDeductionRate>> {
        let rates = sqlx::query_as::<_, StatutoryDeductionRate>(
            "SELECT name, rate_bps, is_active FROM statutory_deduction_rates WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rates.len(), "Loaded active statutory rates");
        Ok(rates)
    }

    /// Bracket table of one fiscal year, ascending by lower bound.
    ///
    /// An empty vector means no table is configured for that year.
    pub async fn tax_brackets(&self, fiscal_year: i32) -> DbResult<Vec<TaxBracket>> {
        let brackets = sqlx::query_as::<_, TaxBracket>(
            r#"
            SELECT fiscal_year, lower_bound_cents, upper_bound_cents, rate_bps
            FROM tax_brackets
            WHERE fiscal_year = ?1
            ORDER BY lower_bound_cents
            "#,
        )
        .bind(fiscal_year)
        .fetch_all(&self.pool)
        .await?;

        debug!(fiscal_year, count = brackets.len(), "Loaded tax brackets");
        Ok(brackets)
    }

    /// Adds a statutory rate.
    pub async fn insert_rate(&self, rate: &StatutoryDeductionRate) -> DbResult<()> {
        sqlx::query("INSERT INTO statutory_deduction_rates (name, rate_bps, is_active) VALUES (?1, ?2, ?3)")
            .bind(&rate.name)
            .bind(rate.rate_bps)
            .bind(rate.is_active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Adds one bracket to a fiscal year's table.
    pub async fn insert_bracket(&self, bracket: &TaxBracket) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tax_brackets (fiscal_year, lower_bound_cents, upper_bound_cents, rate_bps)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(bracket.fiscal_year)
        .bind(bracket.lower_bound_cents)
        .bind(bracket.upper_bound_cents)
        .bind(bracket.rate_bps)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of configured statutory rates, active or not.
    pub async fn rate_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM statutory_deduction_rates")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use nomina_core::{Money, Rate};

    #[tokio::test]
    async fn test_rates_and_brackets() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.deduction_config();

        repo.insert_rate(&StatutoryDeductionRate {
            name: "Social security".to_string(),
            rate_bps: 1_067,
            is_active: true,
        })
        .await
        .unwrap();
        repo.insert_rate(&StatutoryDeductionRate {
            name: "Retired levy".to_string(),
            rate_bps: 500,
            is_active: false,
        })
        .await
        .unwrap();

        let active = repo.active_rates().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].rate().bps(), 1_067);
        assert_eq!(repo.rate_count().await.unwrap(), 2);

        repo.insert_bracket(&TaxBracket::new(2026, Money::from_major(922_000), None, Rate::from_percent(10)))
            .await
            .unwrap();
        repo.insert_bracket(&TaxBracket::new(
            2026,
            Money::zero(),
            Some(Money::from_major(922_000)),
            Rate::zero(),
        ))
        .await
        .unwrap();

        let brackets = repo.tax_brackets(2026).await.unwrap();
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[0].lower_bound(), Money::zero());
        assert!(brackets[1].upper_bound().is_none());
        assert!(repo.tax_brackets(2025).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_rate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.deduction_config();
        let rate = StatutoryDeductionRate {
            name: "Social security".to_string(),
            rate_bps: 950,
            is_active: true,
        };

        repo.insert_rate(&rate).await.unwrap();
        let err = repo.insert_rate(&rate).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
