use crate::error::{AppError, AppResult};
use crate::model::attendance::{
    AttendanceEvent, CaptureMethod, DayGroup, EventKind, EventStatus, NewAttendanceEvent,
};
use crate::repo::AttendanceRepo;
use crate::service::day_groups::{group_by_day, utc_bounds};
use crate::service::photo::{PhotoStore, decode_photo};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Longest range a single report may cover.
pub const MAX_REPORT_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct Capture {
    pub employee_id: u64,
    pub kind: EventKind,
    pub method: CaptureMethod,
    pub confidence: Option<f64>,
    /// Base64 snapshot from the camera
    pub photo: Option<String>,
    pub at: DateTime<Utc>,
}

/// Face captures under the confidence threshold and unverified manual
/// entries wait for HR review. Kiosk PIN captures are already verified.
pub fn initial_status(method: CaptureMethod, confidence: Option<f64>, min_confidence: f64) -> EventStatus {
    match (method, confidence) {
        (CaptureMethod::Face, Some(c)) if c >= min_confidence => EventStatus::Approved,
        (CaptureMethod::Face, _) | (CaptureMethod::Manual, _) => EventStatus::Pending,
        (CaptureMethod::Pin, _) => EventStatus::Approved,
    }
}

pub async fn record(
    repo: &dyn AttendanceRepo,
    photos: &dyn PhotoStore,
    min_confidence: f64,
    capture: Capture,
) -> AppResult<AttendanceEvent> {
    if let Some(c) = capture.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(AppError::bad_request("confidence must be between 0 and 1"));
        }
    }

    if capture.method == CaptureMethod::Face {
        if capture.confidence.is_none() {
            return Err(AppError::bad_request("Face captures require a confidence score"));
        }
        if capture.photo.is_none() {
            return Err(AppError::bad_request("Face captures require a photo"));
        }
    }

    let photo_key = match capture.photo.as_deref() {
        Some(encoded) => {
            let bytes = decode_photo(encoded)?;
            Some(photos.put(capture.employee_id, bytes).await?)
        }
        None => None,
    };

    let status = initial_status(capture.method, capture.confidence, min_confidence);

    let event = repo
        .insert_event(NewAttendanceEvent {
            employee_id: capture.employee_id,
            kind: capture.kind,
            timestamp: capture.at,
            method: capture.method,
            confidence: capture.confidence,
            photo_key,
            status,
        })
        .await?;

    tracing::info!(
        event_id = event.id,
        employee_id = event.employee_id,
        kind = %event.kind,
        method = %event.method,
        status = %event.status,
        "Attendance event recorded"
    );

    Ok(event)
}

pub async fn day_report(
    repo: &dyn AttendanceRepo,
    tz: &Tz,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<DayGroup>> {
    if from > to {
        return Err(AppError::bad_request("from cannot be after to"));
    }
    if (to - from).num_days() >= MAX_REPORT_DAYS {
        return Err(AppError::bad_request("Report range is limited to one year"));
    }

    let (start, end) = utc_bounds(tz, from, to);
    let events = repo.events_between(employee_id, start, end).await?;

    Ok(group_by_day(&events, tz)
        .into_iter()
        .filter(|d| d.date >= from && d.date <= to)
        .collect())
}

/// Approves or rejects a pending face capture.
pub async fn review(repo: &dyn AttendanceRepo, event_id: u64, approve: bool) -> AppResult<EventStatus> {
    let target = if approve {
        EventStatus::Approved
    } else {
        EventStatus::Rejected
    };

    if !repo
        .transition_status(event_id, EventStatus::Pending, target)
        .await?
    {
        return Err(AppError::bad_request("Event not found or already reviewed"));
    }

    tracing::info!(event_id, status = %target, "Attendance event reviewed");
    Ok(target)
}
