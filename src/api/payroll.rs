use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::payroll::{PayrollReceipt, Period};
use crate::model::role::Capability;
use crate::repo::{PayrollRepo, ReceiptFilter};
use crate::service::payroll::process_period;

#[derive(Deserialize, ToSchema)]
pub struct LiquidationRequest {
    #[schema(example = "2026-03", value_type = String)]
    pub period: Period,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReceiptQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = "2026-03")]
    pub period: Option<String>,

    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedReceiptResponse {
    pub data: Vec<PayrollReceipt>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Liquidates a period for every active employee
#[utoipa::path(
    post,
    path = "/api/payroll/liquidations",
    request_body = LiquidationRequest,
    responses(
        (status = 200, description = "Liquidation finished", body = LiquidationSummary),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn run_liquidation(
    auth: AuthUser,
    repo: web::Data<dyn PayrollRepo>,
    config: web::Data<Config>,
    payload: web::Json<LiquidationRequest>,
) -> AppResult<impl Responder> {
    auth.require(Capability::RunPayroll)?;

    tracing::info!(period = %payload.period, by = %auth.username, "Liquidation requested");
    let summary = process_period(repo.get_ref(), &config.payroll, payload.period).await?;

    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/payroll/receipts",
    params(ReceiptQuery),
    responses(
        (status = 200, description = "Paginated receipts", body = PaginatedReceiptResponse),
        (status = 400, description = "Invalid period")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_receipts(
    auth: AuthUser,
    repo: web::Data<dyn PayrollRepo>,
    query: web::Query<ReceiptQuery>,
) -> AppResult<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let period = query
        .period
        .as_deref()
        .map(str::parse::<Period>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    // Without payroll access only the caller's own receipts are listed
    let employee_id = if auth.capabilities.contains(Capability::ViewPayroll) {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };

    let filter = ReceiptFilter {
        period,
        employee_id,
        limit: per_page,
        offset: (page - 1) * per_page,
    };
    let (data, total) = repo.list_receipts(&filter).await?;

    Ok(HttpResponse::Ok().json(PaginatedReceiptResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/receipts/{receipt_id}",
    params(("receipt_id" = u64, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt found", body = PayrollReceipt),
        (status = 404, description = "Receipt not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_receipt(
    auth: AuthUser,
    repo: web::Data<dyn PayrollRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    let receipt = repo
        .get_receipt(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Receipt not found"))?;

    auth.require_self_or(receipt.employee_id, Capability::ViewPayroll)?;

    Ok(HttpResponse::Ok().json(receipt))
}
