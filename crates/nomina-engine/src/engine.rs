//! # Payroll Engine
//!
//! The handle callers hold. It owns the database and the employee directory
//! and hands out the component services, which are cheap to construct.

use std::sync::Arc;

use nomina_core::query::Page;
use nomina_core::{PayrollBatch, TimeEntry};
use nomina_db::Database;

use crate::config::EngineConfig;
use crate::directory::EmployeeDirectory;
use crate::error::PayrollResult;
use crate::services::{
    ApplyOvertimeAndBonusRequest, BonusLedger, GenerateBatchRequest, OvertimeAdjuster, PayrollBatchGenerator,
    PayrollBatchReversal, PayrollQuery, RegisterHoursRequest, RevertConfirmation, SearchBatchesRequest,
    TimeEntryRecorder,
};

#[derive(Clone)]
pub struct PayrollEngine {
    db: Database,
    directory: Arc<dyn EmployeeDirectory>,
    config: EngineConfig,
}

impl PayrollEngine {
    pub fn new(db: Database, directory: Arc<dyn EmployeeDirectory>, config: EngineConfig) -> Self {
        PayrollEngine { db, directory, config }
    }

    /// Engine whose directory is the `employees` table of the same store.
    pub fn with_employee_table(db: Database, config: EngineConfig) -> Self {
        let directory: Arc<dyn EmployeeDirectory> = Arc::new(db.employees());
        PayrollEngine::new(db, directory, config)
    }

    /// Opens the configured database (running migrations) and builds the
    /// engine on it.
    pub async fn connect(config: EngineConfig) -> PayrollResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(PayrollEngine::with_employee_table(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    pub fn recorder(&self) -> TimeEntryRecorder {
        TimeEntryRecorder::new(self.db.clone(), Arc::clone(&self.directory))
    }

    pub fn bonuses(&self) -> BonusLedger {
        BonusLedger::new(self.db.clone())
    }

    pub fn overtime(&self) -> OvertimeAdjuster {
        OvertimeAdjuster::new(self.db.clone())
    }

    pub fn generator(&self) -> PayrollBatchGenerator {
        PayrollBatchGenerator::new(self.db.clone(), Arc::clone(&self.directory))
    }

    pub fn reversal(&self) -> PayrollBatchReversal {
        PayrollBatchReversal::new(self.db.clone())
    }

    pub fn query(&self) -> PayrollQuery {
        PayrollQuery::new(
            self.db.clone(),
            Arc::clone(&self.directory),
            self.config.default_page_size,
            self.config.max_page_size,
        )
    }

    // -------------------------------------------------------------------------
    // Inbound operations
    // -------------------------------------------------------------------------

    pub async fn register_hours(&self, request: RegisterHoursRequest) -> PayrollResult<TimeEntry> {
        self.recorder().register_hours(request).await
    }

    pub async fn apply_overtime_and_bonus(&self, request: ApplyOvertimeAndBonusRequest) -> PayrollResult<TimeEntry> {
        self.overtime().apply_overtime_and_bonus(request).await
    }

    pub async fn generate_batch(&self, request: GenerateBatchRequest) -> PayrollResult<PayrollBatch> {
        self.generator().generate(request).await
    }

    pub async fn revert_batch(&self, batch_id: &str) -> PayrollResult<RevertConfirmation> {
        self.reversal().revert(batch_id).await
    }

    pub async fn search_batches(&self, request: SearchBatchesRequest) -> PayrollResult<Page<PayrollBatch>> {
        self.query().search_batches(request).await
    }
}
