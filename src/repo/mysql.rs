use super::{
    AttendanceRepo, EmployeeDirectory, PayrollRepo, PinRepo, ReceiptFilter, VacationListFilter,
    VacationRepo,
};
use crate::db::is_duplicate_key;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceEvent, EventStatus, NewAttendanceEvent};
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::payroll::{NewPayrollReceipt, PayrollLine, PayrollReceipt, Period};
use crate::model::pin::PinCredential;
use crate::model::vacation::VacationRequest;
use crate::service::vacation::validate_request;
use crate::utils::db_utils::{like_pattern, placeholders};
use crate::utils::employee_cache;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

/// MySQL-backed implementation of every data-access trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("corrupt {what} row: {detail}"))
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    kind: String,
    event_time: DateTime<Utc>,
    method: String,
    confidence: Option<f64>,
    photo_key: Option<String>,
    status: String,
}

impl TryFrom<AttendanceRow> for AttendanceEvent {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceEvent {
            id: row.id,
            employee_id: row.employee_id,
            kind: row.kind.parse().map_err(|e| corrupt("attendance", e))?,
            timestamp: row.event_time,
            method: row.method.parse().map_err(|e| corrupt("attendance", e))?,
            confidence: row.confidence,
            photo_key: row.photo_key,
            status: row.status.parse().map_err(|e| corrupt("attendance", e))?,
        })
    }
}

const EVENT_COLUMNS: &str =
    "id, employee_id, kind, event_time, method, confidence, photo_key, status";

fn into_events(rows: Vec<AttendanceRow>) -> AppResult<Vec<AttendanceEvent>> {
    rows.into_iter().map(AttendanceEvent::try_from).collect()
}

#[async_trait]
impl AttendanceRepo for MySqlStore {
    async fn insert_event(&self, event: NewAttendanceEvent) -> AppResult<AttendanceEvent> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_events
                (employee_id, kind, event_time, method, confidence, photo_key, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.employee_id)
        .bind(event.kind.to_string())
        .bind(event.timestamp)
        .bind(event.method.to_string())
        .bind(event.confidence)
        .bind(event.photo_key.clone())
        .bind(event.status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(event.into_event(result.last_insert_id()))
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM attendance_events
            WHERE employee_id = ? AND event_time >= ? AND event_time < ?
            ORDER BY event_time, id
            "#
        );

        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        into_events(rows)
    }

    async fn events_with_status(
        &self,
        status: EventStatus,
        limit: u32,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM attendance_events
            WHERE status = ?
            ORDER BY event_time
            LIMIT ?
            "#
        );

        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(status.to_string())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        into_events(rows)
    }

    async fn transition_status(
        &self,
        id: u64,
        from: EventStatus,
        to: EventStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE attendance_events SET status = ? WHERE id = ? AND status = ?")
            .bind(to.to_string())
            .bind(id)
            .bind(from.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PinRepo for MySqlStore {
    async fn get_credential(&self, employee_id: u64) -> AppResult<Option<PinCredential>> {
        let cred = sqlx::query_as::<_, PinCredential>(
            r#"
            SELECT employee_id, pin_hash, failed_attempts, locked_until
            FROM pin_credentials
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cred)
    }

    async fn save_attempts(
        &self,
        employee_id: u64,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE pin_credentials SET failed_attempts = ?, locked_until = ? WHERE employee_id = ?",
        )
        .bind(failed_attempts)
        .bind(locked_until)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_pin(&self, employee_id: u64, pin_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pin_credentials (employee_id, pin_hash, failed_attempts, locked_until)
            VALUES (?, ?, 0, NULL)
            ON DUPLICATE KEY UPDATE
                pin_hash = VALUES(pin_hash),
                failed_attempts = 0,
                locked_until = NULL
            "#,
        )
        .bind(employee_id)
        .bind(pin_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unlock(&self, employee_id: u64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE pin_credentials SET failed_attempts = 0, locked_until = NULL WHERE employee_id = ?",
        )
        .bind(employee_id)
        .execute(&self.pool)
        .await?;

        // MySQL counts changed rows only; an already-clear credential reports 0.
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.get_credential(employee_id).await?.is_some())
    }
}

#[derive(FromRow)]
struct ReceiptRow {
    id: u64,
    employee_id: u64,
    period: String,
    earnings: String,
    deductions: String,
    gross: f64,
    total_deductions: f64,
    net: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReceiptRow> for PayrollReceipt {
    type Error = AppError;

    fn try_from(row: ReceiptRow) -> Result<Self, Self::Error> {
        let earnings: Vec<PayrollLine> =
            serde_json::from_str(&row.earnings).map_err(|e| corrupt("receipt", e))?;
        let deductions: Vec<PayrollLine> =
            serde_json::from_str(&row.deductions).map_err(|e| corrupt("receipt", e))?;

        Ok(PayrollReceipt {
            id: row.id,
            employee_id: row.employee_id,
            period: row.period.parse().map_err(|e| corrupt("receipt", e))?,
            earnings,
            deductions,
            gross: row.gross,
            total_deductions: row.total_deductions,
            net: row.net,
            created_at: row.created_at,
        })
    }
}

const RECEIPT_COLUMNS: &str =
    "id, employee_id, period, earnings, deductions, gross, total_deductions, net, created_at";

const EMPLOYEE_COLUMNS: &str = "id, employee_code, document_number, first_name, last_name, email, \
     branch_id, hire_date, base_salary, health_insurance_rate, union_rate, status";

enum FilterValue {
    U64(u64),
    Str(String),
}

#[async_trait]
impl PayrollRepo for MySqlStore {
    async fn active_employees(&self) -> AppResult<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE status = 'active' ORDER BY id");

        let employees = sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(employees)
    }

    async fn receipt_exists(&self, employee_id: u64, period: Period) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payroll_receipts WHERE employee_id = ? AND period = ?",
        )
        .bind(employee_id)
        .bind(period.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_receipt(&self, receipt: NewPayrollReceipt) -> AppResult<PayrollReceipt> {
        let earnings = serde_json::to_string(&receipt.earnings)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let deductions = serde_json::to_string(&receipt.deductions)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO payroll_receipts
                (employee_id, period, earnings, deductions, gross, total_deductions, net, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(receipt.employee_id)
        .bind(receipt.period.to_string())
        .bind(earnings)
        .bind(deductions)
        .bind(receipt.gross)
        .bind(receipt.total_deductions)
        .bind(receipt.net)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(receipt.into_receipt(done.last_insert_id(), created_at)),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "Employee {} already has a receipt for {}",
                receipt.employee_id, receipt.period
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_receipt(&self, id: u64) -> AppResult<Option<PayrollReceipt>> {
        let sql = format!("SELECT {RECEIPT_COLUMNS} FROM payroll_receipts WHERE id = ?");

        sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PayrollReceipt::try_from)
            .transpose()
    }

    async fn list_receipts(&self, filter: &ReceiptFilter) -> AppResult<(Vec<PayrollReceipt>, i64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(period) = filter.period {
            where_sql.push_str(" AND period = ?");
            args.push(FilterValue::Str(period.to_string()));
        }

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        let count_sql = format!("SELECT COUNT(*) FROM payroll_receipts{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {RECEIPT_COLUMNS} FROM payroll_receipts{where_sql} \
             ORDER BY period DESC, employee_id LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, ReceiptRow>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }

        let rows = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let receipts = rows
            .into_iter()
            .map(PayrollReceipt::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((receipts, total))
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn search_active(&self, query: &str, limit: u32) -> AppResult<Vec<EmployeeSummary>> {
        let like = like_pattern(query);

        let found = sqlx::query_as::<_, EmployeeSummary>(
            r#"
            SELECT id, employee_code, CONCAT(first_name, ' ', last_name) AS full_name
            FROM employees
            WHERE status = 'active'
              AND (first_name LIKE ? OR last_name LIKE ? OR employee_code LIKE ? OR document_number LIKE ?)
            ORDER BY last_name, first_name
            LIMIT ?
            "#,
        )
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for summary in &found {
            employee_cache::put(summary.clone()).await;
        }

        Ok(found)
    }

    async fn active_summary(&self, employee_id: u64) -> AppResult<Option<EmployeeSummary>> {
        if let Some(hit) = employee_cache::get(employee_id).await {
            return Ok(Some(hit));
        }

        let summary = sqlx::query_as::<_, EmployeeSummary>(
            r#"
            SELECT id, employee_code, CONCAT(first_name, ' ', last_name) AS full_name
            FROM employees
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(s) = &summary {
            employee_cache::put(s.clone()).await;
        }

        Ok(summary)
    }

    async fn reassign_branch(&self, ids: &[u64], branch_id: u64) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let in_list = placeholders(ids.len());

        let mut tx = self.pool.begin().await?;

        let lock_sql = format!("SELECT id FROM employees WHERE id IN ({in_list}) FOR UPDATE");
        let mut lock_query = sqlx::query_scalar::<_, u64>(&lock_sql);
        for id in ids {
            lock_query = lock_query.bind(*id);
        }
        let found = lock_query.fetch_all(&mut *tx).await?;

        let missing: Vec<u64> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Employees not found: {missing:?}")));
        }

        let update_sql = format!("UPDATE employees SET branch_id = ? WHERE id IN ({in_list})");
        let mut update = sqlx::query(&update_sql).bind(branch_id);
        for id in ids {
            update = update.bind(*id);
        }
        update.execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(ids.len() as u64)
    }
}

const REQUEST_COLUMNS: &str = "id, employee_id, start_date, end_date, days, status, created_at";

#[async_trait]
impl VacationRepo for MySqlStore {
    async fn hire_date(&self, employee_id: u64) -> AppResult<Option<NaiveDate>> {
        let hired = sqlx::query_scalar::<_, NaiveDate>("SELECT hire_date FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(hired)
    }

    async fn requests_holding_days(&self, employee_id: u64) -> AppResult<Vec<VacationRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM vacation_requests \
             WHERE employee_id = ? AND status IN ('pending', 'approved')"
        );

        let requests = sqlx::query_as::<_, VacationRequest>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    async fn create_request(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<VacationRequest> {
        let mut tx = self.pool.begin().await?;

        // The employee row lock serializes concurrent requests of one employee
        let hired = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT hire_date FROM employees WHERE id = ? FOR UPDATE",
        )
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM vacation_requests \
             WHERE employee_id = ? AND status IN ('pending', 'approved')"
        );
        let existing = sqlx::query_as::<_, VacationRequest>(&sql)
            .bind(employee_id)
            .fetch_all(&mut *tx)
            .await?;

        let days = validate_request(hired, start, end, &existing)?;
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO vacation_requests (employee_id, start_date, end_date, days, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .bind(days)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(VacationRequest {
            id: result.last_insert_id(),
            employee_id,
            start_date: start,
            end_date: end,
            days,
            status: "pending".into(),
            created_at: Some(created_at),
        })
    }

    async fn review_request(&self, id: u64, status: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE vacation_requests SET status = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_request(&self, id: u64) -> AppResult<Option<VacationRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM vacation_requests WHERE id = ?");

        let request = sqlx::query_as::<_, VacationRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn list_requests(
        &self,
        filter: &VacationListFilter,
    ) -> AppResult<(Vec<VacationRequest>, i64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        if let Some(status) = &filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.clone()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM vacation_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM vacation_requests{where_sql} \
             ORDER BY start_date DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, VacationRequest>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
            };
        }

        let data = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((data, total))
    }
}
