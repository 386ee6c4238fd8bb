//! Data-access interfaces injected into handlers as `web::Data<dyn Trait>`.

use crate::error::AppResult;
use crate::model::attendance::{AttendanceEvent, EventStatus, NewAttendanceEvent};
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::payroll::{NewPayrollReceipt, PayrollReceipt, Period};
use crate::model::pin::PinCredential;
use crate::model::vacation::VacationRequest;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    async fn insert_event(&self, event: NewAttendanceEvent) -> AppResult<AttendanceEvent>;

    /// Events of one employee with `from <= timestamp < to`, oldest first.
    async fn events_between(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>>;

    async fn events_with_status(&self, status: EventStatus, limit: u32)
    -> AppResult<Vec<AttendanceEvent>>;

    /// Moves an event from `from` to `to`; false when it was not in `from`.
    async fn transition_status(&self, id: u64, from: EventStatus, to: EventStatus)
    -> AppResult<bool>;
}

#[async_trait]
pub trait PinRepo: Send + Sync {
    async fn get_credential(&self, employee_id: u64) -> AppResult<Option<PinCredential>>;

    async fn save_attempts(
        &self,
        employee_id: u64,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Sets a new PIN and clears attempts and lockout.
    async fn upsert_pin(&self, employee_id: u64, pin_hash: &str) -> AppResult<()>;

    /// Clears attempts and lockout; false when no credential exists.
    async fn unlock(&self, employee_id: u64) -> AppResult<bool>;
}

#[async_trait]
pub trait PayrollRepo: Send + Sync {
    async fn active_employees(&self) -> AppResult<Vec<Employee>>;

    async fn receipt_exists(&self, employee_id: u64, period: Period) -> AppResult<bool>;

    /// Fails with `AppError::Conflict` when the employee already has a receipt for the period.
    async fn insert_receipt(&self, receipt: NewPayrollReceipt) -> AppResult<PayrollReceipt>;

    async fn get_receipt(&self, id: u64) -> AppResult<Option<PayrollReceipt>>;

    async fn list_receipts(&self, filter: &ReceiptFilter) -> AppResult<(Vec<PayrollReceipt>, i64)>;
}

#[derive(Debug, Clone, Default)]
pub struct ReceiptFilter {
    pub period: Option<Period>,
    pub employee_id: Option<u64>,
    pub limit: u32,
    pub offset: u32,
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Active employees whose name, code or document matches `query`.
    async fn search_active(&self, query: &str, limit: u32) -> AppResult<Vec<EmployeeSummary>>;

    /// `None` for unknown or inactive employees.
    async fn active_summary(&self, employee_id: u64) -> AppResult<Option<EmployeeSummary>>;

    /// Moves every employee in `ids` to `branch_id`, or none of them.
    /// Fails with `AppError::NotFound` naming the missing ids.
    async fn reassign_branch(&self, ids: &[u64], branch_id: u64) -> AppResult<u64>;
}

#[async_trait]
pub trait VacationRepo: Send + Sync {
    async fn hire_date(&self, employee_id: u64) -> AppResult<Option<NaiveDate>>;

    /// Pending and approved requests of one employee.
    async fn requests_holding_days(&self, employee_id: u64) -> AppResult<Vec<VacationRequest>>;

    /// Checks the new range with `service::vacation::validate_request` and stores
    /// it as pending. Requests of the same employee are serialized.
    async fn create_request(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<VacationRequest>;

    /// Moves a pending request to `status`; false when it is missing or not pending.
    async fn review_request(&self, id: u64, status: &str) -> AppResult<bool>;

    async fn get_request(&self, id: u64) -> AppResult<Option<VacationRequest>>;

    async fn list_requests(&self, filter: &VacationListFilter)
    -> AppResult<(Vec<VacationRequest>, i64)>;
}

#[derive(Debug, Clone, Default)]
pub struct VacationListFilter {
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub limit: u32,
    pub offset: u32,
}
