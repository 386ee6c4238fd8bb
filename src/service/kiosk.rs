//! Server-side kiosk sessions: search, enter PIN, capture photo, processing.

use crate::error::AppError;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::EmployeeSummary;
use moka::future::Cache;
use serde::Serialize;
use std::time::Duration;
use strum_macros::Display;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KioskStep {
    Search,
    EnterPin,
    CapturePhoto,
    Processing,
    Success,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("cannot {action} while in step {from}")]
pub struct InvalidTransition {
    pub from: KioskStep,
    pub action: &'static str,
}

impl From<InvalidTransition> for AppError {
    fn from(e: InvalidTransition) -> Self {
        AppError::Conflict(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KioskSession {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub step: KioskStep,
    pub employee: Option<EmployeeSummary>,
    /// Message of the last failed step, cleared on the next success
    pub last_error: Option<String>,
    pub event: Option<AttendanceEvent>,
}

type Step = Result<(), InvalidTransition>;

impl KioskSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: KioskStep::Search,
            employee: None,
            last_error: None,
            event: None,
        }
    }

    fn ensure_step(&self, allowed: &[KioskStep], action: &'static str) -> Step {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.step,
                action,
            })
        }
    }

    /// Search or EnterPin → EnterPin for the chosen employee.
    pub fn select_employee(&mut self, employee: EmployeeSummary) -> Step {
        self.ensure_step(&[KioskStep::Search, KioskStep::EnterPin], "select an employee")?;
        self.employee = Some(employee);
        self.step = KioskStep::EnterPin;
        self.last_error = None;
        Ok(())
    }

    pub fn employee_id(&self) -> Option<u64> {
        self.employee.as_ref().map(|e| e.id)
    }

    pub fn pin_accepted(&mut self) -> Step {
        self.ensure_step(&[KioskStep::EnterPin], "accept a PIN")?;
        self.step = KioskStep::CapturePhoto;
        self.last_error = None;
        Ok(())
    }

    /// Wrong PIN: stay on EnterPin.
    pub fn pin_rejected(&mut self, message: String) -> Step {
        self.ensure_step(&[KioskStep::EnterPin], "reject a PIN")?;
        self.last_error = Some(message);
        Ok(())
    }

    /// Locked credential: back to Search with the employee cleared.
    pub fn pin_blocked(&mut self, message: String) -> Step {
        self.ensure_step(&[KioskStep::EnterPin], "block a PIN")?;
        self.employee = None;
        self.step = KioskStep::Search;
        self.last_error = Some(message);
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<u64, InvalidTransition> {
        self.ensure_step(&[KioskStep::CapturePhoto], "submit a capture")?;
        let employee_id = self.employee_id().ok_or(InvalidTransition {
            from: self.step,
            action: "submit a capture",
        })?;
        self.step = KioskStep::Processing;
        Ok(employee_id)
    }

    /// Processing → Success, or back to CapturePhoto on failure.
    pub fn finish(&mut self, result: Result<AttendanceEvent, String>) -> Step {
        self.ensure_step(&[KioskStep::Processing], "finish processing")?;
        match result {
            Ok(event) => {
                self.step = KioskStep::Success;
                self.event = Some(event);
                self.last_error = None;
            }
            Err(message) => {
                self.step = KioskStep::CapturePhoto;
                self.last_error = Some(message);
            }
        }
        Ok(())
    }
}

impl Default for KioskSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Live kiosk sessions; idle ones expire after the configured TTL.
#[derive(Clone)]
pub struct KioskSessions {
    inner: Cache<Uuid, KioskSession>,
}

impl KioskSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(ttl)
                .build(),
        }
    }

    pub async fn open(&self) -> KioskSession {
        let session = KioskSession::new();
        self.inner.insert(session.id, session.clone()).await;
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<KioskSession, AppError> {
        self.inner
            .get(&id)
            .await
            .ok_or_else(|| AppError::not_found("Kiosk session not found or expired"))
    }

    pub async fn save(&self, session: &KioskSession) {
        self.inner.insert(session.id, session.clone()).await;
    }

    pub async fn close(&self, id: Uuid) {
        self.inner.invalidate(&id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{CaptureMethod, EventKind, EventStatus};

    fn lucia() -> EmployeeSummary {
        EmployeeSummary {
            id: 1,
            employee_code: "EMP-001".into(),
            full_name: "Lucía Gómez".into(),
        }
    }

    fn captured(employee_id: u64) -> AttendanceEvent {
        AttendanceEvent {
            id: 10,
            employee_id,
            kind: EventKind::Entrance,
            timestamp: "2026-03-02T08:00:00Z".parse().unwrap(),
            method: CaptureMethod::Pin,
            confidence: None,
            photo_key: Some("1/snap.jpg".into()),
            status: EventStatus::Approved,
        }
    }

    #[test]
    fn happy_path_reaches_success() {
        let mut s = KioskSession::new();
        s.select_employee(lucia()).unwrap();
        assert_eq!(s.step, KioskStep::EnterPin);
        s.pin_accepted().unwrap();
        assert_eq!(s.step, KioskStep::CapturePhoto);
        let employee_id = s.begin_processing().unwrap();
        assert_eq!(employee_id, 1);
        assert_eq!(s.step, KioskStep::Processing);
        s.finish(Ok(captured(employee_id))).unwrap();
        assert_eq!(s.step, KioskStep::Success);
        assert_eq!(s.event.as_ref().map(|e| e.id), Some(10));
        assert!(s.last_error.is_none());
    }

    #[test]
    fn failed_processing_returns_to_capture() {
        let mut s = KioskSession::new();
        s.select_employee(lucia()).unwrap();
        s.pin_accepted().unwrap();
        s.begin_processing().unwrap();
        s.finish(Err("storage down".into())).unwrap();
        assert_eq!(s.step, KioskStep::CapturePhoto);
        assert_eq!(s.last_error.as_deref(), Some("storage down"));
        assert!(s.event.is_none());
    }

    #[test]
    fn cannot_skip_the_pin() {
        let mut s = KioskSession::new();
        s.select_employee(lucia()).unwrap();
        let err = s.begin_processing().unwrap_err();
        assert_eq!(err.from, KioskStep::EnterPin);
    }

    #[test]
    fn blocked_pin_returns_to_search() {
        let mut s = KioskSession::new();
        s.select_employee(lucia()).unwrap();
        s.pin_rejected("wrong".into()).unwrap();
        assert_eq!(s.step, KioskStep::EnterPin);
        s.pin_blocked("locked".into()).unwrap();
        assert_eq!(s.step, KioskStep::Search);
        assert!(s.employee.is_none());
    }

    #[test]
    fn processing_refuses_a_second_submit() {
        let mut s = KioskSession::new();
        s.select_employee(lucia()).unwrap();
        s.pin_accepted().unwrap();
        s.begin_processing().unwrap();
        assert!(s.begin_processing().is_err());
        assert!(s.select_employee(lucia()).is_err());
    }

    #[actix_web::test]
    async fn sessions_are_stored_and_closed() {
        let sessions = KioskSessions::new(Duration::from_secs(60));
        let mut s = sessions.open().await;
        s.select_employee(lucia()).unwrap();
        sessions.save(&s).await;

        assert_eq!(sessions.get(s.id).await.unwrap().step, KioskStep::EnterPin);
        sessions.close(s.id).await;
        assert!(matches!(sessions.get(s.id).await, Err(AppError::NotFound(_))));
    }
}
