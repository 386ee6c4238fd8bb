use crate::{
    auth::auth::AuthUser,
    db::is_duplicate_key,
    error::{AppError, AppResult},
    model::{employee::Employee, role::Capability},
    repo::EmployeeDirectory,
    utils::{
        db_utils::{build_update_sql, execute_update, like_pattern},
        employee_cache,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns a partial update may touch.
const UPDATABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "document_number",
    "first_name",
    "last_name",
    "email",
    "branch_id",
    "hire_date",
    "base_salary",
    "health_insurance_rate",
    "union_rate",
    "status",
];

const MAX_REASSIGN_BATCH: usize = 500;

const EMPLOYEE_STATUSES: &[&str] = &["active", "inactive"];

fn check_rate(rate: f64) -> Result<(), AppError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(AppError::bad_request("Rates must be between 0 and 1"));
    }
    Ok(())
}

fn check_salary(salary: f64) -> Result<(), AppError> {
    if !salary.is_finite() || salary < 0.0 {
        return Err(AppError::bad_request("Base salary cannot be negative"));
    }
    Ok(())
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "30111222")]
    pub document_number: String,
    #[schema(example = "Lucía")]
    pub first_name: String,
    #[schema(example = "Gómez")]
    pub last_name: String,
    #[schema(example = "lucia.gomez@company.com", format = "email")]
    pub email: String,
    #[schema(example = 2)]
    pub branch_id: Option<u64>,
    #[schema(example = "2022-03-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = 100000.0)]
    pub base_salary: f64,
    #[schema(example = 0.03)]
    pub health_insurance_rate: Option<f64>,
    #[schema(example = 0.02)]
    pub union_rate: Option<f64>,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), AppError> {
        if self.employee_code.trim().is_empty()
            || self.first_name.trim().is_empty()
            || self.last_name.trim().is_empty()
        {
            return Err(AppError::bad_request("Code, first name and last name are required"));
        }
        if !self.email.contains('@') {
            return Err(AppError::bad_request("Invalid email"));
        }
        check_salary(self.base_salary)?;
        for rate in [self.health_insurance_rate, self.union_rate].into_iter().flatten() {
            check_rate(rate)?;
        }
        Ok(())
    }
}

/// Applies the creation rules to each field of a partial update.
/// Unknown fields are left to the column whitelist.
fn validate_update(body: &Value) -> Result<(), AppError> {
    let Some(fields) = body.as_object() else {
        return Ok(());
    };

    for (key, value) in fields {
        let invalid = || AppError::BadRequest(format!("Invalid value for '{key}'"));
        match key.as_str() {
            "employee_code" | "document_number" | "first_name" | "last_name" => {
                let text = value.as_str().ok_or_else(invalid)?;
                if text.trim().is_empty() {
                    return Err(AppError::BadRequest(format!("'{key}' cannot be empty")));
                }
            }
            "email" => {
                if !value.as_str().ok_or_else(invalid)?.contains('@') {
                    return Err(AppError::bad_request("Invalid email"));
                }
            }
            "branch_id" => {
                if !value.is_null() && value.as_u64().is_none() {
                    return Err(invalid());
                }
            }
            "hire_date" => {
                value
                    .as_str()
                    .and_then(|d| d.parse::<NaiveDate>().ok())
                    .ok_or_else(invalid)?;
            }
            "base_salary" => check_salary(value.as_f64().ok_or_else(invalid)?)?,
            "health_insurance_rate" | "union_rate" => check_rate(value.as_f64().ok_or_else(invalid)?)?,
            "status" => {
                let status = value.as_str().ok_or_else(invalid)?;
                if !EMPLOYEE_STATUSES.contains(&status) {
                    return Err(AppError::BadRequest(format!(
                        "status must be one of {EMPLOYEE_STATUSES:?}"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub branch_id: Option<u64>,
    #[schema(example = "active")]
    pub status: Option<String>,
    /// Matches name, email, code or document
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct ReassignBranch {
    #[schema(example = json!([1, 2, 3]))]
    pub employee_ids: Vec<u64>,
    #[schema(example = 4)]
    pub branch_id: u64,
}

/// Sorted, duplicate-free ids, bounded in size.
fn normalize_ids(mut ids: Vec<u64>) -> Result<Vec<u64>, AppError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::bad_request("employee_ids cannot be empty"));
    }
    if ids.len() > MAX_REASSIGN_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_REASSIGN_BATCH} employees per reassignment"
        )));
    }
    Ok(ids)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "message": "Employee created successfully", "id": 12
        })),
        (status = 409, description = "Duplicate employee code, document or email")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageEmployees)?;
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, document_number, first_name, last_name, email, branch_id,
         hire_date, base_salary, health_insurance_rate, union_rate, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active')
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.document_number.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim().to_lowercase())
    .bind(payload.branch_id)
    .bind(payload.hire_date)
    .bind(payload.base_salary)
    .bind(payload.health_insurance_rate.unwrap_or(0.0))
    .bind(payload.union_rate.unwrap_or(0.0))
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let id = res.last_insert_id();
            info!(employee_id = id, code = %payload.employee_code, "Employee created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created successfully",
                "id": id
            })))
        }
        Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(
            "Employee code, document or email already exists".into(),
        )),
        Err(e) => {
            error!(error = %e, "Failed to create employee");
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageEmployees)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(branch_id) = query.branch_id {
        conditions.push("branch_id = ?");
        bindings.push(branch_id.into());
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone().into());
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? \
             OR employee_code LIKE ? OR document_number LIKE ?)",
        );
        let like = like_pattern(search);
        for _ in 0..5 {
            bindings.push(like.clone().into());
        }
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) AS total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        AppError::from(e)
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, employee_code, document_number, first_name, last_name, email, branch_id, \
         hire_date, base_salary, health_insurance_rate, union_rate, status \
         FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Field cannot be updated"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageEmployees)?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE_COLUMNS, "id", employee_id)?;
    validate_update(&body)?;

    let affected = match execute_update(pool.get_ref(), update).await {
        Ok(n) => n,
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::Conflict("Employee code, document or email already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    if affected == 0 {
        // MySQL reports 0 for unchanged rows too
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await?;
        if exists == 0 {
            return Err(AppError::not_found("Employee not found"));
        }
    }

    employee_cache::invalidate(employee_id).await;
    info!(employee_id, by = %auth.username, "Employee updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated successfully" })))
}

/// Deactivate Employee
///
/// Receipts and attendance keep pointing at the record, so it is only marked inactive.
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee deactivated", body = Object, example = json!({
            "message": "Employee deactivated"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageEmployees)?;
    let employee_id = path.into_inner();

    let res = sqlx::query("UPDATE employees SET status = 'inactive' WHERE id = ? AND status <> 'inactive'")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to deactivate employee");
            AppError::from(e)
        })?;

    if res.rows_affected() == 0 {
        return Err(AppError::not_found("Employee not found"));
    }

    employee_cache::invalidate(employee_id).await;
    info!(employee_id, by = %auth.username, "Employee deactivated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deactivated" })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or(employee_id, Capability::ManageEmployees)?;

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_code, document_number, first_name, last_name, email,
               branch_id, hire_date, base_salary, health_insurance_rate, union_rate, status
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        AppError::from(e)
    })?;

    employee
        .map(|emp| HttpResponse::Ok().json(emp))
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

/// Move employees to another branch, all or nothing
#[utoipa::path(
    put,
    path = "/api/employee/branch",
    request_body = ReassignBranch,
    responses(
        (status = 200, description = "Employees reassigned", body = Object, example = json!({
            "message": "Employees reassigned", "updated": 3
        })),
        (status = 404, description = "Some employees do not exist; nothing was changed")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reassign_branch(
    auth: AuthUser,
    directory: web::Data<dyn EmployeeDirectory>,
    payload: web::Json<ReassignBranch>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageEmployees)?;
    let ReassignBranch {
        employee_ids,
        branch_id,
    } = payload.into_inner();
    let ids = normalize_ids(employee_ids)?;

    let updated = directory
        .reassign_branch(&ids, branch_id)
        .await
        .inspect_err(|e| info!(error = %e, branch_id, "Branch reassignment refused"))?;

    for id in &ids {
        employee_cache::invalidate(*id).await;
    }
    info!(count = updated, branch_id, by = %auth.username, "Employees reassigned");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employees reassigned",
        "updated": updated
    })))
}
