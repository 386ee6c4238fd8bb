use super::{
    AttendanceRepo, EmployeeDirectory, PayrollRepo, PinRepo, ReceiptFilter, VacationListFilter,
    VacationRepo,
};
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceEvent, EventStatus, NewAttendanceEvent};
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::payroll::{NewPayrollReceipt, PayrollReceipt, Period};
use crate::model::pin::PinCredential;
use crate::model::vacation::VacationRequest;
use crate::service::photo::PhotoStore;
use crate::service::vacation::validate_request;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process store used by handler and service tests.
#[derive(Default)]
pub struct MemoryStore {
    pub employees: Mutex<Vec<Employee>>,
    pub events: Mutex<Vec<AttendanceEvent>>,
    pub pins: Mutex<HashMap<u64, PinCredential>>,
    pub receipts: Mutex<Vec<PayrollReceipt>>,
    pub photos: Mutex<HashMap<String, Vec<u8>>>,
    pub vacations: Mutex<Vec<VacationRequest>>,
}

pub fn employee(id: u64, first: &str, last: &str, base_salary: f64) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{id:03}"),
        document_number: format!("30{id:06}"),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@company.test", first.to_lowercase()),
        branch_id: Some(1),
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        base_salary,
        health_insurance_rate: 0.03,
        union_rate: 0.02,
        status: "active".to_string(),
    }
}

impl MemoryStore {
    pub fn with_employees(employees: Vec<Employee>) -> Self {
        let store = Self::default();
        *store.employees.lock().unwrap() = employees;
        store
    }
}

#[async_trait]
impl AttendanceRepo for MemoryStore {
    async fn insert_event(&self, event: NewAttendanceEvent) -> AppResult<AttendanceEvent> {
        let mut events = self.events.lock().unwrap();
        let stored = event.into_event(events.len() as u64 + 1);
        events.push(stored.clone());
        Ok(stored)
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let mut found: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.employee_id == employee_id && e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.timestamp, e.id));
        Ok(found)
    }

    async fn events_with_status(
        &self,
        status: EventStatus,
        limit: u32,
    ) -> AppResult<Vec<AttendanceEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == status)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: u64,
        from: EventStatus,
        to: EventStatus,
    ) -> AppResult<bool> {
        let mut events = self.events.lock().unwrap();
        match events.iter_mut().find(|e| e.id == id && e.status == from) {
            Some(e) => {
                e.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PinRepo for MemoryStore {
    async fn get_credential(&self, employee_id: u64) -> AppResult<Option<PinCredential>> {
        Ok(self.pins.lock().unwrap().get(&employee_id).cloned())
    }

    async fn save_attempts(
        &self,
        employee_id: u64,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if let Some(cred) = self.pins.lock().unwrap().get_mut(&employee_id) {
            cred.failed_attempts = failed_attempts;
            cred.locked_until = locked_until;
        }
        Ok(())
    }

    async fn upsert_pin(&self, employee_id: u64, pin_hash: &str) -> AppResult<()> {
        self.pins
            .lock()
            .unwrap()
            .insert(employee_id, PinCredential::new(employee_id, pin_hash.to_string()));
        Ok(())
    }

    async fn unlock(&self, employee_id: u64) -> AppResult<bool> {
        match self.pins.lock().unwrap().get_mut(&employee_id) {
            Some(cred) => {
                cred.failed_attempts = 0;
                cred.locked_until = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PayrollRepo for MemoryStore {
    async fn active_employees(&self) -> AppResult<Vec<Employee>> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect())
    }

    async fn receipt_exists(&self, employee_id: u64, period: Period) -> AppResult<bool> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.employee_id == employee_id && r.period == period))
    }

    async fn insert_receipt(&self, receipt: NewPayrollReceipt) -> AppResult<PayrollReceipt> {
        let mut receipts = self.receipts.lock().unwrap();
        if receipts
            .iter()
            .any(|r| r.employee_id == receipt.employee_id && r.period == receipt.period)
        {
            return Err(AppError::Conflict("duplicate receipt".into()));
        }
        let stored = receipt.into_receipt(receipts.len() as u64 + 1, Utc::now());
        receipts.push(stored.clone());
        Ok(stored)
    }

    async fn get_receipt(&self, id: u64) -> AppResult<Option<PayrollReceipt>> {
        Ok(self.receipts.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list_receipts(&self, filter: &ReceiptFilter) -> AppResult<(Vec<PayrollReceipt>, i64)> {
        let receipts = self.receipts.lock().unwrap();
        let matching: Vec<_> = receipts
            .iter()
            .filter(|r| filter.period.is_none_or(|p| r.period == p))
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn search_active(&self, query: &str, limit: u32) -> AppResult<Vec<EmployeeSummary>> {
        let q = query.trim().to_lowercase();
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_active())
            .filter(|e| {
                e.full_name().to_lowercase().contains(&q)
                    || e.employee_code.to_lowercase().contains(&q)
                    || e.document_number.contains(&q)
            })
            .take(limit as usize)
            .map(EmployeeSummary::from)
            .collect())
    }

    async fn active_summary(&self, employee_id: u64) -> AppResult<Option<EmployeeSummary>> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == employee_id && e.is_active())
            .map(EmployeeSummary::from))
    }

    async fn reassign_branch(&self, ids: &[u64], branch_id: u64) -> AppResult<u64> {
        let mut employees = self.employees.lock().unwrap();
        let missing: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| !employees.iter().any(|e| e.id == *id))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::NotFound(format!("Employees not found: {missing:?}")));
        }

        for e in employees.iter_mut().filter(|e| ids.contains(&e.id)) {
            e.branch_id = Some(branch_id);
        }
        Ok(ids.len() as u64)
    }
}

#[async_trait]
impl VacationRepo for MemoryStore {
    async fn hire_date(&self, employee_id: u64) -> AppResult<Option<NaiveDate>> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == employee_id)
            .map(|e| e.hire_date))
    }

    async fn requests_holding_days(&self, employee_id: u64) -> AppResult<Vec<VacationRequest>> {
        Ok(self
            .vacations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.employee_id == employee_id && r.holds_days())
            .cloned()
            .collect())
    }

    async fn create_request(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<VacationRequest> {
        let hired = self
            .hire_date(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee not found"))?;

        let mut vacations = self.vacations.lock().unwrap();
        let existing: Vec<_> = vacations
            .iter()
            .filter(|r| r.employee_id == employee_id && r.holds_days())
            .cloned()
            .collect();
        let days = validate_request(hired, start, end, &existing)?;

        let stored = VacationRequest {
            id: vacations.len() as u64 + 1,
            employee_id,
            start_date: start,
            end_date: end,
            days,
            status: "pending".into(),
            created_at: Some(Utc::now()),
        };
        vacations.push(stored.clone());
        Ok(stored)
    }

    async fn review_request(&self, id: u64, status: &str) -> AppResult<bool> {
        let mut vacations = self.vacations.lock().unwrap();
        match vacations.iter_mut().find(|r| r.id == id && r.status == "pending") {
            Some(r) => {
                r.status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_request(&self, id: u64) -> AppResult<Option<VacationRequest>> {
        Ok(self.vacations.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &VacationListFilter,
    ) -> AppResult<(Vec<VacationRequest>, i64)> {
        let vacations = self.vacations.lock().unwrap();
        let mut matching: Vec<_> = vacations
            .iter()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.status.as_deref().is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn put(&self, employee_id: u64, bytes: Vec<u8>) -> AppResult<String> {
        let mut photos = self.photos.lock().unwrap();
        let key = format!("{employee_id}/{}.jpg", photos.len() + 1);
        photos.insert(key.clone(), bytes);
        Ok(key)
    }
}
