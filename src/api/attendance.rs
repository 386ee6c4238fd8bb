use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{CaptureMethod, DayGroup, EventKind, EventStatus};
use crate::model::role::Capability;
use crate::repo::AttendanceRepo;
use crate::service::attendance::{self, Capture};
use crate::service::photo::PhotoStore;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    pub kind: EventKind,
    /// `face` or `manual`; PIN captures go through the kiosk, manual ones wait for review
    pub method: CaptureMethod,
    #[schema(example = 0.93)]
    pub confidence: Option<f64>,
    /// Base64 JPEG, optionally as a data URL
    pub photo: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    /// Defaults to the caller's own employee record
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    #[param(value_type = String, format = Date)]
    pub from: NaiveDate,
    #[schema(example = "2026-03-31", format = "date", value_type = String)]
    #[param(value_type = String, format = Date)]
    pub to: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub days: Vec<DayGroup>,
    #[schema(example = 168.5)]
    pub total_hours: f64,
}

#[derive(Deserialize, IntoParams)]
pub struct PendingQuery {
    pub limit: Option<u32>,
}

/// Clock in/out for the authenticated employee
#[utoipa::path(
    post,
    path = "/api/attendance/events",
    request_body = ClockRequest,
    responses(
        (status = 201, description = "Event recorded", body = AttendanceEvent),
        (status = 400, description = "Invalid capture"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    photos: web::Data<dyn PhotoStore>,
    config: web::Data<Config>,
    payload: web::Json<ClockRequest>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ClockSelf)?;
    let employee_id = auth.employee_id()?;

    let payload = payload.into_inner();
    if payload.method == CaptureMethod::Pin {
        return Err(AppError::bad_request("PIN captures must use the kiosk"));
    }

    let event = attendance::record(
        repo.get_ref(),
        photos.get_ref(),
        config.face_min_confidence,
        Capture {
            employee_id,
            kind: payload.kind,
            method: payload.method,
            confidence: payload.confidence,
            photo: payload.photo,
            at: Utc::now(),
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(event))
}

/// Worked hours per day
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Hours grouped by local day", body = ReportResponse),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn report(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> AppResult<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.employee_id()?,
    };
    auth.require_self_or(employee_id, Capability::ViewAttendance)?;

    let days = attendance::day_report(
        repo.get_ref(),
        &config.timezone,
        employee_id,
        query.from,
        query.to,
    )
    .await?;

    let total_hours = (days.iter().map(|d| d.total_hours).sum::<f64>() * 10.0).round() / 10.0;

    Ok(HttpResponse::Ok().json(ReportResponse {
        employee_id,
        days,
        total_hours,
    }))
}

/// Face and manual captures awaiting review
#[utoipa::path(
    get,
    path = "/api/attendance/pending",
    params(("limit" = Option<u32>, Query, description = "Max events, default 50")),
    responses(
        (status = 200, description = "Pending events", body = [AttendanceEvent]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn pending(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    query: web::Query<PendingQuery>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ApproveAttendance)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let events = repo.events_with_status(EventStatus::Pending, limit).await?;

    Ok(HttpResponse::Ok().json(events))
}

async fn review(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    event_id: u64,
    approve: bool,
) -> AppResult<HttpResponse> {
    auth.require(Capability::ApproveAttendance)?;

    let status = attendance::review(repo.get_ref(), event_id, approve).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Event {status}"),
        "status": status
    })))
}

#[utoipa::path(
    put,
    path = "/api/attendance/{event_id}/approve",
    params(("event_id" = u64, Path, description = "Attendance event id")),
    responses(
        (status = 200, description = "Event approved", body = Object, example = json!({
            "message": "Event approved", "status": "approved"
        })),
        (status = 400, description = "Event not found or already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn approve(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    review(auth, repo, path.into_inner(), true).await
}

#[utoipa::path(
    put,
    path = "/api/attendance/{event_id}/reject",
    params(("event_id" = u64, Path, description = "Attendance event id")),
    responses(
        (status = 200, description = "Event rejected", body = Object, example = json!({
            "message": "Event rejected", "status": "rejected"
        })),
        (status = 400, description = "Event not found or already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn reject(
    auth: AuthUser,
    repo: web::Data<dyn AttendanceRepo>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    review(auth, repo, path.into_inner(), false).await
}

#[cfg(test)]
mod tests {
    use crate::auth::jwt::bearer;
    use crate::model::attendance::{AttendanceEvent, EventStatus};
    use crate::model::role::Role;
    use crate::test_support::TestHarness;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn employee_clocks_and_reads_own_report() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;
        let token = bearer(Role::Employee, Some(1), &h.config.jwt_secret);
        let hr = bearer(Role::Hr, None, &h.config.jwt_secret);

        for kind in ["entrance", "exit"] {
            let req = test::TestRequest::post()
                .uri("/api/attendance/events")
                .insert_header(("Authorization", token.clone()))
                .set_json(json!({ "kind": kind, "method": "manual" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let event: AttendanceEvent = test::read_body_json(resp).await;

            let req = test::TestRequest::put()
                .uri(&format!("/api/attendance/{}/approve", event.id))
                .insert_header(("Authorization", hr.clone()))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let today = chrono::Utc::now().date_naive();
        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance/report?from={today}&to={today}"))
            .insert_header(("Authorization", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["employee_id"], 1);
        assert_eq!(body["days"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn manual_self_clock_waits_for_review() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/events")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1), &h.config.jwt_secret)))
            .set_json(json!({ "kind": "entrance", "method": "manual" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let event: AttendanceEvent = test::read_body_json(resp).await;
        assert_eq!(event.status, EventStatus::Pending);
        assert!(event.photo_key.is_none());

        let req = test::TestRequest::get()
            .uri("/api/attendance/pending")
            .insert_header(("Authorization", bearer(Role::Hr, None, &h.config.jwt_secret)))
            .to_request();
        let pending: Vec<AttendanceEvent> = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, event.id);
    }

    #[actix_web::test]
    async fn employee_cannot_read_someone_else() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::get()
            .uri("/api/attendance/report?employee_id=2&from=2026-03-01&to=2026-03-31")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1), &h.config.jwt_secret)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn low_confidence_face_goes_to_review() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/events")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1), &h.config.jwt_secret)))
            .set_json(json!({
                "kind": "entrance",
                "method": "face",
                "confidence": 0.2,
                "photo": "aGVsbG8="
            }))
            .to_request();
        let event: AttendanceEvent = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(event.status, EventStatus::Pending);

        let hr = bearer(Role::Hr, None, &h.config.jwt_secret);
        let req = test::TestRequest::get()
            .uri("/api/attendance/pending")
            .insert_header(("Authorization", hr.clone()))
            .to_request();
        let pending: Vec<AttendanceEvent> = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(pending.len(), 1);

        let req = test::TestRequest::put()
            .uri(&format!("/api/attendance/{}/approve", event.id))
            .insert_header(("Authorization", hr))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(h.store.events.lock().unwrap()[0].status, EventStatus::Approved);
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::get().uri("/api/attendance/pending").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
