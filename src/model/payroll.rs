use chrono::{DateTime, Datelike, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

/// A liquidation period, one calendar month, written `YYYY-MM`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
#[display(fmt = "{:04}-{:02}", year, month)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or_default()
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid period '{s}', expected YYYY-MM"))?;
        let year = y.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        Period::new(year, month).ok_or_else(|| format!("invalid period '{s}'"))
    }
}

impl TryFrom<String> for Period {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, StrumDisplay, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Concept {
    BaseSalary,
    Seniority,
    Presentismo,
    Pension,
    Law19032,
    HealthInsurance,
    Union,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayrollLine {
    pub concept: Concept,
    /// Rate applied, when the line is percentage based
    #[schema(example = 0.11)]
    pub rate: Option<f64>,
    #[schema(example = 12320.0)]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollReceipt {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-03", value_type = String)]
    pub period: Period,
    pub earnings: Vec<PayrollLine>,
    pub deductions: Vec<PayrollLine>,
    #[schema(example = 112000.0)]
    pub gross: f64,
    #[schema(example = 21280.0)]
    pub total_deductions: f64,
    #[schema(example = 90720.0)]
    pub net: f64,
    #[schema(example = "2026-04-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayrollReceipt {
    pub employee_id: u64,
    pub period: Period,
    pub earnings: Vec<PayrollLine>,
    pub deductions: Vec<PayrollLine>,
    pub gross: f64,
    pub total_deductions: f64,
    pub net: f64,
}

impl NewPayrollReceipt {
    pub fn into_receipt(self, id: u64, created_at: DateTime<Utc>) -> PayrollReceipt {
        PayrollReceipt {
            id,
            employee_id: self.employee_id,
            period: self.period,
            earnings: self.earnings,
            deductions: self.deductions,
            gross: self.gross,
            total_deductions: self.total_deductions,
            net: self.net,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkippedEmployee {
    pub employee_id: u64,
    #[schema(example = "receipt already exists")]
    pub reason: String,
}

/// Outcome of one liquidation run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LiquidationSummary {
    #[schema(example = "2026-03", value_type = String)]
    pub period: Period,
    #[schema(example = 12)]
    pub processed: u32,
    pub skipped: Vec<SkippedEmployee>,
    #[schema(example = 1088640.0)]
    pub total_net: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_periods() {
        let p: Period = "2026-02".parse().unwrap();
        assert_eq!(p.to_string(), "2026-02");
        assert_eq!(p.first_day(), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(p.last_day(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(
            "2025-12".parse::<Period>().unwrap().last_day(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn rejects_bad_periods() {
        assert!("2026-13".parse::<Period>().is_err());
        assert!("2026".parse::<Period>().is_err());
        assert!("abcd-01".parse::<Period>().is_err());
    }

    #[test]
    fn period_serializes_as_string() {
        let p = Period::new(2026, 3).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"2026-03\"");
        let back: Period = serde_json::from_str("\"2026-03\"").unwrap();
        assert_eq!(back, p);
    }
}
