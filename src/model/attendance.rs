use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Entrance,
    Exit,
    PauseStart,
    PauseEnd,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptureMethod {
    Pin,
    Face,
    Manual,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
    Approved,
    Pending,
    Rejected,
}

/// A single fichaje. Append-only apart from `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    pub kind: EventKind,
    #[schema(example = "2026-03-02T11:00:00Z", value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub method: CaptureMethod,
    #[schema(example = 0.92)]
    pub confidence: Option<f64>,
    pub photo_key: Option<String>,
    pub status: EventStatus,
}

#[derive(Debug, Clone)]
pub struct NewAttendanceEvent {
    pub employee_id: u64,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub method: CaptureMethod,
    pub confidence: Option<f64>,
    pub photo_key: Option<String>,
    pub status: EventStatus,
}

impl NewAttendanceEvent {
    pub fn into_event(self, id: u64) -> AttendanceEvent {
        AttendanceEvent {
            id,
            employee_id: self.employee_id,
            kind: self.kind,
            timestamp: self.timestamp,
            method: self.method,
            confidence: self.confidence,
            photo_key: self.photo_key,
            status: self.status,
        }
    }
}

/// Worked time for one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayGroup {
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:00:00", value_type = String)]
    pub entrance: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = String)]
    pub exit: Option<NaiveTime>,
    #[schema(example = 8.5)]
    pub total_hours: f64,
    #[schema(example = 0.5)]
    pub pause_hours: f64,
}
