use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{CaptureMethod, EventKind};
use crate::model::employee::EmployeeSummary;
use crate::model::role::Capability;
use crate::repo::{AttendanceRepo, EmployeeDirectory, PinRepo};
use crate::service::attendance::{self, Capture};
use crate::service::kiosk::{KioskSession, KioskSessions};
use crate::service::photo::PhotoStore;
use crate::service::pin_policy::{PinOutcome, PinPolicy, verify_pin};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Name, employee code or document number
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectEmployee {
    #[schema(example = 1000)]
    pub employee_id: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct PinEntry {
    #[schema(example = "4821")]
    pub pin: String,
}

#[derive(Serialize, ToSchema)]
pub struct PinResponse {
    pub outcome: PinOutcome,
    pub session: KioskSession,
}

#[derive(Deserialize, ToSchema)]
pub struct KioskCapture {
    pub kind: EventKind,
    /// Base64 JPEG taken after the PIN was accepted
    pub photo: Option<String>,
}

fn session_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid session id"))
}

/// Starts a new kiosk session at the search step
#[utoipa::path(
    post,
    path = "/api/kiosk/sessions",
    responses(
        (status = 201, description = "Session opened", body = KioskSession),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn open_session(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let session = sessions.open().await;
    tracing::debug!(session_id = %session.id, kiosk_user = %auth.username, "Kiosk session opened");

    Ok(HttpResponse::Created().json(session))
}

#[utoipa::path(
    get,
    path = "/api/kiosk/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Kiosk session UUID")),
    responses(
        (status = 200, description = "Current session state", body = KioskSession),
        (status = 404, description = "Session not found or expired")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn get_session(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let session = sessions.get(session_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    delete,
    path = "/api/kiosk/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Kiosk session UUID")),
    responses((status = 204, description = "Session closed")),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn close_session(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    sessions.close(session_id(&path)?).await;
    Ok(HttpResponse::NoContent().finish())
}

/// Active employees matching the search box
#[utoipa::path(
    get,
    path = "/api/kiosk/employees",
    params(
        ("q" = String, Query, description = "Name, employee code or document number"),
        ("limit" = Option<u32>, Query, description = "Max results, default 10")
    ),
    responses((status = 200, description = "Matching employees", body = [EmployeeSummary])),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn search_employees(
    auth: AuthUser,
    directory: web::Data<dyn EmployeeDirectory>,
    query: web::Query<SearchQuery>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let term = query.q.trim();
    if term.chars().count() < 2 {
        return Ok(HttpResponse::Ok().json(Vec::<EmployeeSummary>::new()));
    }

    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let found = directory.search_active(term, limit).await?;

    Ok(HttpResponse::Ok().json(found))
}

#[utoipa::path(
    post,
    path = "/api/kiosk/sessions/{session_id}/employee",
    params(("session_id" = String, Path, description = "Kiosk session UUID")),
    request_body = SelectEmployee,
    responses(
        (status = 200, description = "Employee selected, waiting for PIN", body = KioskSession),
        (status = 404, description = "Unknown session or employee"),
        (status = 409, description = "Not allowed in the current step")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn select_employee(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
    directory: web::Data<dyn EmployeeDirectory>,
    path: web::Path<String>,
    payload: web::Json<SelectEmployee>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let mut session = sessions.get(session_id(&path)?).await?;

    let employee = directory
        .active_summary(payload.employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    session.select_employee(employee)?;
    sessions.save(&session).await;

    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/api/kiosk/sessions/{session_id}/pin",
    params(("session_id" = String, Path, description = "Kiosk session UUID")),
    request_body = PinEntry,
    responses(
        (status = 200, description = "PIN checked; see outcome", body = PinResponse),
        (status = 404, description = "Unknown session or no PIN configured"),
        (status = 409, description = "Not allowed in the current step")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn enter_pin(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
    pins: web::Data<dyn PinRepo>,
    config: web::Data<Config>,
    path: web::Path<String>,
    payload: web::Json<PinEntry>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let mut session = sessions.get(session_id(&path)?).await?;
    let employee_id = session
        .employee_id()
        .ok_or_else(|| AppError::Conflict("Select an employee first".into()))?;

    let outcome = verify_pin(
        pins.get_ref(),
        PinPolicy::from_config(&config),
        employee_id,
        &payload.pin,
        Utc::now(),
    )
    .await?;

    match &outcome {
        PinOutcome::Verified => session.pin_accepted()?,
        PinOutcome::Invalid { remaining_attempts } => session.pin_rejected(format!(
            "Wrong PIN, {remaining_attempts} attempt(s) left"
        ))?,
        PinOutcome::Blocked { until } => {
            let local = until.with_timezone(&config.timezone);
            session.pin_blocked(format!("PIN locked until {}", local.format("%H:%M")))?
        }
    }
    sessions.save(&session).await;

    Ok(HttpResponse::Ok().json(PinResponse { outcome, session }))
}

/// Records the attendance event for the verified employee
#[utoipa::path(
    post,
    path = "/api/kiosk/sessions/{session_id}/capture",
    params(("session_id" = String, Path, description = "Kiosk session UUID")),
    request_body = KioskCapture,
    responses(
        (status = 201, description = "Event recorded", body = KioskSession),
        (status = 400, description = "Invalid photo; session back at capture step"),
        (status = 409, description = "PIN not verified yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn capture(
    auth: AuthUser,
    sessions: web::Data<KioskSessions>,
    repo: web::Data<dyn AttendanceRepo>,
    photos: web::Data<dyn PhotoStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    payload: web::Json<KioskCapture>,
) -> AppResult<impl Responder> {
    auth.require(Capability::OperateKiosk)?;

    let mut session = sessions.get(session_id(&path)?).await?;
    let employee_id = session.begin_processing()?;
    sessions.save(&session).await;

    let payload = payload.into_inner();
    let result = attendance::record(
        repo.get_ref(),
        photos.get_ref(),
        config.face_min_confidence,
        Capture {
            employee_id,
            kind: payload.kind,
            method: CaptureMethod::Pin,
            confidence: None,
            photo: payload.photo,
            at: Utc::now(),
        },
    )
    .await;

    match result {
        Ok(event) => {
            session.finish(Ok(event))?;
            sessions.save(&session).await;
            Ok(HttpResponse::Created().json(session))
        }
        Err(e) => {
            session.finish(Err(e.to_string()))?;
            sessions.save(&session).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::jwt::bearer;
    use crate::auth::password::hash_secret;
    use crate::model::role::Role;
    use crate::repo::PinRepo;
    use crate::service::kiosk::KioskStep;
    use crate::test_support::TestHarness;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    async fn harness_with_pin() -> TestHarness {
        let h = TestHarness::new();
        h.store
            .upsert_pin(1, &hash_secret("4821").unwrap())
            .await
            .unwrap();
        h
    }

    #[actix_web::test]
    async fn full_kiosk_flow_records_pin_event() {
        let h = harness_with_pin().await;
        let app = test::init_service(h.app()).await;
        let token = bearer(Role::Kiosk, None, &h.config.jwt_secret);

        let req = test::TestRequest::get()
            .uri("/api/kiosk/employees?q=gom")
            .insert_header(("Authorization", token.clone()))
            .to_request();
        let found: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(found[0]["id"], 1);

        let req = test::TestRequest::post()
            .uri("/api/kiosk/sessions")
            .insert_header(("Authorization", token.clone()))
            .to_request();
        let session: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let id = session["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/kiosk/sessions/{id}/employee"))
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "employee_id": 1 }))
            .to_request();
        let session: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(session["step"], KioskStep::EnterPin.to_string());

        let req = test::TestRequest::post()
            .uri(&format!("/api/kiosk/sessions/{id}/pin"))
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "pin": "4821" }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["outcome"]["outcome"], "verified");
        assert_eq!(body["session"]["step"], "capture_photo");

        let req = test::TestRequest::post()
            .uri(&format!("/api/kiosk/sessions/{id}/capture"))
            .insert_header(("Authorization", token))
            .set_json(json!({ "kind": "entrance", "photo": "aGVsbG8=" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let session: Value = test::read_body_json(resp).await;
        assert_eq!(session["step"], "success");
        assert_eq!(session["event"]["method"], "pin");

        assert_eq!(h.store.events.lock().unwrap().len(), 1);
        assert_eq!(h.store.photos.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn repeated_wrong_pins_send_session_back_to_search() {
        let h = harness_with_pin().await;
        let app = test::init_service(h.app()).await;
        let token = bearer(Role::Kiosk, None, &h.config.jwt_secret);

        let req = test::TestRequest::post()
            .uri("/api/kiosk/sessions")
            .insert_header(("Authorization", token.clone()))
            .to_request();
        let session: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let id = session["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/kiosk/sessions/{id}/employee"))
            .insert_header(("Authorization", token.clone()))
            .set_json(json!({ "employee_id": 1 }))
            .to_request();
        test::call_service(&app, req).await;

        let mut last = Value::Null;
        for _ in 0..h.config.pin_max_attempts {
            let req = test::TestRequest::post()
                .uri(&format!("/api/kiosk/sessions/{id}/pin"))
                .insert_header(("Authorization", token.clone()))
                .set_json(json!({ "pin": "0000" }))
                .to_request();
            last = test::read_body_json(test::call_service(&app, req).await).await;
        }

        assert_eq!(last["outcome"]["outcome"], "blocked");
        assert_eq!(last["session"]["step"], "search");
        assert!(last["session"]["employee"].is_null());
        assert!(h.store.pins.lock().unwrap()[&1u64].locked_until.is_some());
    }

    #[actix_web::test]
    async fn capture_before_pin_conflicts() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;
        let token = bearer(Role::Kiosk, None, &h.config.jwt_secret);

        let req = test::TestRequest::post()
            .uri("/api/kiosk/sessions")
            .insert_header(("Authorization", token.clone()))
            .to_request();
        let session: Value = test::read_body_json(test::call_service(&app, req).await).await;
        let id = session["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/kiosk/sessions/{id}/capture"))
            .insert_header(("Authorization", token))
            .set_json(json!({ "kind": "entrance" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn employees_cannot_operate_kiosk() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/kiosk/sessions")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1), &h.config.jwt_secret)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_session_is_not_found() {
        let h = TestHarness::new();
        let app = test::init_service(h.app()).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/kiosk/sessions/{}", uuid::Uuid::new_v4()))
            .insert_header(("Authorization", bearer(Role::Kiosk, None, &h.config.jwt_secret)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
