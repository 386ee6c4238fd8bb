use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VacationRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-18", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 14)]
    pub days: u32,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2025-12-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

impl VacationRequest {
    /// Pending and approved requests both hold days.
    pub fn holds_days(&self) -> bool {
        self.status == "pending" || self.status == "approved"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VacationBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 14)]
    pub entitled: u32,
    #[schema(example = 7)]
    pub approved: u32,
    #[schema(example = 0)]
    pub pending: u32,
    #[schema(example = 7)]
    pub available: i64,
}
