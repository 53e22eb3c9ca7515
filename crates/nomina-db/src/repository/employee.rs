//! # Employee Repository
//!
//! The `employees` table backing the default employee directory. HR owns
//! this data; the payroll engine only asks who exists and who is active.

use nomina_core::Employee;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for employee directory rows.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    /// Creates a new EmployeeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Gets an employee by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>("SELECT id, name, email, is_active FROM employees WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(employee)
    }

    /// Employees whose name or email contains `needle`, case-insensitively.
    pub async fn search(&self, needle: &str) -> DbResult<Vec<Employee>> {
        let needle = needle.trim();
        debug!(needle = %needle, "Searching employees");

        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, name, email, is_active
            FROM employees
            WHERE LOWER(name) LIKE ?1 ESCAPE '\' OR LOWER(email) LIKE ?1 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }

    /// Adds an employee.
    pub async fn insert(&self, employee: &Employee) -> DbResult<()> {
        debug!(id = %employee.id, "Inserting employee");

        sqlx::query("INSERT INTO employees (id, name, email, is_active) VALUES (?1, ?2, ?3, ?4)")
            .bind(&employee.id)
            .bind(&employee.name)
            .bind(&employee.email)
            .bind(employee.is_active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Flips the active flag.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE employees SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Total number of employees.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
