use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::budget::PrizeRedemption;
use crate::model::payroll::Period;
use crate::model::role::Capability;
use crate::service::budget::summarize;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AllocateBudget {
    #[schema(example = 500000.0)]
    pub amount: f64,
}

fn parse_period(raw: &str) -> AppResult<Period> {
    raw.parse().map_err(AppError::BadRequest)
}

/// Presupuesto of a month with what was already redeemed
#[utoipa::path(
    get,
    path = "/api/budget/{period}",
    params(("period" = String, Path, description = "Month as YYYY-MM")),
    responses(
        (status = 200, description = "Budget summary", body = BudgetSummary),
        (status = 400, description = "Invalid period")
    ),
    security(("bearer_auth" = [])),
    tag = "Budget"
)]
pub async fn budget_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageBudgets)?;
    let period = parse_period(&path)?;

    let allocated = sqlx::query_scalar::<_, f64>("SELECT amount FROM budgets WHERE period = ?")
        .bind(period.to_string())
        .fetch_optional(pool.get_ref())
        .await?
        .unwrap_or(0.0);

    let redemptions = sqlx::query_as::<_, PrizeRedemption>(
        r#"
        SELECT id, employee_id, prize_id, cost, status
        FROM prize_redemptions
        WHERE period = ?
        "#,
    )
    .bind(period.to_string())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(summarize(period, allocated, &redemptions)))
}

/// Sets the amount allocated to a month
#[utoipa::path(
    put,
    path = "/api/budget/{period}",
    params(("period" = String, Path, description = "Month as YYYY-MM")),
    request_body = AllocateBudget,
    responses(
        (status = 200, description = "Budget saved", body = Object, example = json!({
            "message": "Budget saved", "period": "2026-03", "amount": 500000.0
        })),
        (status = 400, description = "Invalid period or amount")
    ),
    security(("bearer_auth" = [])),
    tag = "Budget"
)]
pub async fn allocate_budget(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<AllocateBudget>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageBudgets)?;
    let period = parse_period(&path)?;

    if !payload.amount.is_finite() || payload.amount < 0.0 {
        return Err(AppError::bad_request("Amount cannot be negative"));
    }

    sqlx::query(
        r#"
        INSERT INTO budgets (period, amount) VALUES (?, ?)
        ON DUPLICATE KEY UPDATE amount = VALUES(amount)
        "#,
    )
    .bind(period.to_string())
    .bind(payload.amount)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(%period, amount = payload.amount, by = %auth.username, "Budget allocated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Budget saved",
        "period": period,
        "amount": payload.amount
    })))
}
