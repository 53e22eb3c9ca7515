//! # Employee Directory
//!
//! HR owns employee identity; payroll only asks whether an employee exists,
//! whether they are active, and which ids match a name or email search.
//! The shipped implementation reads the `employees` table through
//! [`EmployeeRepository`].

use async_trait::async_trait;
use nomina_db::EmployeeRepository;

use crate::error::PayrollResult;

/// Read-only view of the employee directory.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Whether the employee is known at all.
    async fn exists(&self, employee_id: &str) -> PayrollResult<bool>;

    /// Whether the employee is known and currently active.
    async fn is_active(&self, employee_id: &str) -> PayrollResult<bool>;

    /// Ids of employees whose name or email contains `needle`.
    async fn matching_ids(&self, needle: &str) -> PayrollResult<Vec<String>>;
}

#[async_trait]
impl EmployeeDirectory for EmployeeRepository {
    async fn exists(&self, employee_id: &str) -> PayrollResult<bool> {
        Ok(self.get_by_id(employee_id).await?.is_some())
    }

    async fn is_active(&self, employee_id: &str) -> PayrollResult<bool> {
        Ok(self.get_by_id(employee_id).await?.is_some_and(|e| e.is_active))
    }

    async fn matching_ids(&self, needle: &str) -> PayrollResult<Vec<String>> {
        Ok(self.search(needle).await?.into_iter().map(|e| e.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_repository_directory() {
        let db = testing::database().await;
        let directory: &dyn EmployeeDirectory = &db.employees();

        assert!(directory.exists("emp-3").await.unwrap());
        assert!(!directory.is_active("emp-3").await.unwrap());
        assert!(directory.is_active("emp-1").await.unwrap());
        assert!(!directory.exists("emp-404").await.unwrap());
        assert!(!directory.is_active("emp-404").await.unwrap());

        assert_eq!(directory.matching_ids("vega").await.unwrap(), vec!["emp-2".to_string()]);
    }
}
