use crate::auth::auth::AuthUser;
use crate::auth::password::hash_secret;
use crate::error::{AppError, AppResult};
use crate::model::pin::is_valid_pin;
use crate::model::role::Capability;
use crate::repo::{EmployeeDirectory, PinRepo};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ResetPin {
    /// 4 to 6 digits
    #[schema(example = "4821")]
    pub pin: String,
}

/// Sets a new PIN and clears any lockout
#[utoipa::path(
    put,
    path = "/api/pin/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    request_body = ResetPin,
    responses(
        (status = 200, description = "PIN updated", body = Object, example = json!({
            "message": "PIN updated"
        })),
        (status = 400, description = "PIN must be 4 to 6 digits"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "PIN"
)]
pub async fn reset_pin(
    auth: AuthUser,
    pins: web::Data<dyn PinRepo>,
    directory: web::Data<dyn EmployeeDirectory>,
    path: web::Path<u64>,
    payload: web::Json<ResetPin>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManagePins)?;
    let employee_id = path.into_inner();

    if !is_valid_pin(&payload.pin) {
        return Err(AppError::bad_request("PIN must be 4 to 6 digits"));
    }

    directory
        .active_summary(employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let pin_hash = hash_secret(&payload.pin)?;
    pins.upsert_pin(employee_id, &pin_hash).await?;

    tracing::info!(employee_id, by = %auth.username, "PIN reset");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "PIN updated" })))
}

/// Clears failed attempts and lockout, keeping the PIN
#[utoipa::path(
    put,
    path = "/api/pin/{employee_id}/unlock",
    params(("employee_id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "PIN unlocked", body = Object, example = json!({
            "message": "PIN unlocked"
        })),
        (status = 404, description = "No PIN configured")
    ),
    security(("bearer_auth" = [])),
    tag = "PIN"
)]
pub async fn unlock_pin(
    auth: AuthUser,
    pins: web::Data<dyn PinRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManagePins)?;
    let employee_id = path.into_inner();

    if !pins.unlock(employee_id).await? {
        return Err(AppError::not_found("No PIN configured for this employee"));
    }

    tracing::info!(employee_id, by = %auth.username, "PIN unlocked");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "PIN unlocked" })))
}
