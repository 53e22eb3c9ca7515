//! # Time Entry Recorder
//!
//! Creates and re-registers work periods. Hours are whole hours, floored;
//! an entry without an end stays incomplete and earns no base pay until it
//! is closed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nomina_core::validation::{self, validate_id};
use nomina_core::{payroll, Money, TimeEntry, ValidationError};
use nomina_db::Database;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::rejected;
use crate::directory::EmployeeDirectory;
use crate::error::{PayrollError, PayrollResult};

/// `RegisterHours` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHoursRequest {
    /// Existing entry to re-register; a new entry is created when absent.
    #[serde(default)]
    pub entry_id: Option<String>,
    pub employee_id: String,
    pub period_start: DateTime<Utc>,
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
    pub hourly_rate_cents: i64,
}

#[derive(Clone)]
pub struct TimeEntryRecorder {
    db: Database,
    directory: Arc<dyn EmployeeDirectory>,
}

impl TimeEntryRecorder {
    pub fn new(db: Database, directory: Arc<dyn EmployeeDirectory>) -> Self {
        TimeEntryRecorder { db, directory }
    }

    /// Creates or re-registers an entry and returns the stored snapshot.
    ///
    /// ## Errors
    /// - `Validation`: period ends before it starts, negative rate, entry
    ///   belongs to another employee
    /// - `NotFound`: unknown employee or entry
    /// - `Conflict`: entry already processed, or changed concurrently
    pub async fn register_hours(&self, request: RegisterHoursRequest) -> PayrollResult<TimeEntry> {
        validate_id("employee_id", &request.employee_id)?;
        if let Some(entry_id) = &request.entry_id {
            validate_id("entry_id", entry_id)?;
        }
        validation::validate_period("period", request.period_start, request.period_end)?;
        let hourly_rate = Money::from_cents(request.hourly_rate_cents);
        validation::validate_amount("hourly_rate", hourly_rate)?;

        if !self.directory.exists(&request.employee_id).await? {
            return Err(PayrollError::not_found("Employee", &request.employee_id));
        }

        let now = Utc::now();
        let entries = self.db.time_entries();
        let mut tx = self.db.begin().await?;

        let mut entry = match &request.entry_id {
            Some(entry_id) => {
                let entry = entries
                    .find_in(&mut tx, entry_id)
                    .await?
                    .ok_or_else(|| PayrollError::not_found("TimeEntry", entry_id))?;

                if entry.employee_id != request.employee_id {
                    return Err(ValidationError::Mismatch {
                        field: "employee_id".to_string(),
                        expected: entry.employee_id,
                        actual: request.employee_id,
                    }
                    .into());
                }
                entry
            }
            None => TimeEntry::new(Uuid::new_v4().to_string(), &request.employee_id, request.period_start, now),
        };

        let entry_id = entry.id.clone();
        payroll::register_hours(&mut entry, request.period_start, request.period_end, hourly_rate, now)
            .map_err(|e| rejected(&entry_id, e))?;

        if request.entry_id.is_some() {
            entries.update(&mut tx, &mut entry).await?;
        } else {
            entries.insert(&mut tx, &entry).await?;
        }
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            employee_id = %entry.employee_id,
            state = entry.state.as_str(),
            hours = entry.hours_worked,
            "Hours registered"
        );
        Ok(entry)
    }
}
