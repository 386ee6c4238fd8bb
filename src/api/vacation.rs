use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::role::Capability;
use crate::model::vacation::VacationRequest;
use crate::repo::{VacationListFilter, VacationRepo};
use crate::service::vacation::balance;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateVacation {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-18", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct VacationFilter {
    /// Filter by employee ID
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    pub employee_id: Option<u64>,
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct VacationListResponse {
    pub data: Vec<VacationRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Request vacation days for the authenticated employee
#[utoipa::path(
    post,
    path = "/api/vacation",
    request_body = CreateVacation,
    responses(
        (status = 201, description = "Vacation request submitted", body = VacationRequest),
        (status = 400, description = "Invalid dates or not enough days"),
        (status = 409, description = "Overlaps an existing request")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn create_vacation(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    payload: web::Json<CreateVacation>,
) -> AppResult<impl Responder> {
    auth.require(Capability::RequestVacation)?;
    let employee_id = auth.employee_id()?;

    let request = repo
        .create_request(employee_id, payload.start_date, payload.end_date)
        .await
        .inspect_err(|e| tracing::info!(error = %e, employee_id, "Vacation request refused"))?;

    tracing::info!(
        request_id = request.id,
        employee_id,
        days = request.days,
        start = %request.start_date,
        "Vacation requested"
    );

    Ok(HttpResponse::Created().json(request))
}

async fn review(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    request_id: u64,
    status: &str,
) -> AppResult<HttpResponse> {
    auth.require(Capability::ApproveVacations)?;

    if !repo.review_request(request_id, status).await? {
        return Err(AppError::bad_request(
            "Vacation request not found or already processed",
        ));
    }

    tracing::info!(request_id, status, by = %auth.username, "Vacation request reviewed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Vacation {status}")
    })))
}

#[utoipa::path(
    put,
    path = "/api/vacation/{request_id}/approve",
    params(("request_id" = u64, Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Vacation approved", body = Object, example = json!({
            "message": "Vacation approved"
        })),
        (status = 400, description = "Vacation request not found or already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn approve_vacation(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    review(auth, repo, path.into_inner(), "approved").await
}

#[utoipa::path(
    put,
    path = "/api/vacation/{request_id}/reject",
    params(("request_id" = u64, Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Vacation rejected", body = Object, example = json!({
            "message": "Vacation rejected"
        })),
        (status = 400, description = "Vacation request not found or already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn reject_vacation(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    review(auth, repo, path.into_inner(), "rejected").await
}

#[utoipa::path(
    get,
    path = "/api/vacation/{request_id}",
    params(("request_id" = u64, Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Vacation request found", body = VacationRequest),
        (status = 404, description = "Vacation request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn get_vacation(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    let request = repo
        .get_request(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Vacation request not found"))?;

    auth.require_self_or(request.employee_id, Capability::ApproveVacations)?;

    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    get,
    path = "/api/vacation",
    params(VacationFilter),
    responses((status = 200, description = "Paginated vacation requests", body = VacationListResponse)),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn vacation_list(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    query: web::Query<VacationFilter>,
) -> AppResult<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100) as u32;
    let page = query.page.unwrap_or(1).max(1) as u32;

    let employee_id = if auth.capabilities.contains(Capability::ApproveVacations) {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };

    let (data, total) = repo
        .list_requests(&VacationListFilter {
            employee_id,
            status: query.status.clone(),
            limit: per_page,
            offset: (page - 1) * per_page,
        })
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch vacation list"))?;

    Ok(HttpResponse::Ok().json(VacationListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Entitled, taken, pending and available days for one year
#[utoipa::path(
    get,
    path = "/api/vacation/balance",
    params(
        ("employee_id" = Option<u64>, Query, description = "Defaults to the caller"),
        ("year" = Option<i32>, Query, description = "Defaults to the current year")
    ),
    responses(
        (status = 200, description = "Vacation balance", body = VacationBalance),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn vacation_balance(
    auth: AuthUser,
    repo: web::Data<dyn VacationRepo>,
    query: web::Query<BalanceQuery>,
) -> AppResult<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.employee_id()?,
    };
    auth.require_self_or(employee_id, Capability::ApproveVacations)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let hired = repo
        .hire_date(employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    let requests = repo.requests_holding_days(employee_id).await?;

    Ok(HttpResponse::Ok().json(balance(employee_id, hired, year, &requests)))
}
