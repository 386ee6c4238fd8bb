use crate::error::AppError;
use crate::model::vacation::{VacationBalance, VacationRequest};
use crate::service::payroll_calc::completed_years;
use chrono::{Datelike, NaiveDate};

/// Statutory days per year by completed seniority at December 31.
pub fn entitlement_days(hire_date: NaiveDate, year: i32) -> u32 {
    let Some(dec_31) = NaiveDate::from_ymd_opt(year, 12, 31) else {
        return 0;
    };
    if hire_date > dec_31 {
        return 0;
    }

    match completed_years(hire_date, dec_31) {
        0..=4 => 14,
        5..=9 => 21,
        10..=19 => 28,
        _ => 35,
    }
}

/// Calendar days, both ends inclusive.
pub fn requested_days(start: NaiveDate, end: NaiveDate) -> u32 {
    ((end - start).num_days() + 1).max(0) as u32
}

pub fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start <= b_end && b_start <= a_end
}

pub fn balance(
    employee_id: u64,
    hire_date: NaiveDate,
    year: i32,
    requests: &[VacationRequest],
) -> VacationBalance {
    let in_year = |r: &&VacationRequest| r.start_date.year() == year;
    let sum = |status: &str| -> u32 {
        requests
            .iter()
            .filter(in_year)
            .filter(|r| r.status == status)
            .map(|r| r.days)
            .sum()
    };

    let entitled = entitlement_days(hire_date, year);
    let approved = sum("approved");
    let pending = sum("pending");

    VacationBalance {
        employee_id,
        year,
        entitled,
        approved,
        pending,
        available: entitled as i64 - approved as i64 - pending as i64,
    }
}

/// Checks a new request against the employee's existing ones.
pub fn validate_request(
    hire_date: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    existing: &[VacationRequest],
) -> Result<u32, AppError> {
    if start > end {
        return Err(AppError::bad_request("start_date cannot be after end_date"));
    }
    if start.year() != end.year() {
        return Err(AppError::bad_request(
            "A vacation request cannot span two calendar years",
        ));
    }

    if let Some(clash) = existing
        .iter()
        .filter(|r| r.holds_days())
        .find(|r| overlaps(start, end, r.start_date, r.end_date))
    {
        return Err(AppError::Conflict(format!(
            "Overlaps vacation request {} ({} to {})",
            clash.id, clash.start_date, clash.end_date
        )));
    }

    let days = requested_days(start, end);
    let available = balance(0, hire_date, start.year(), existing).available;
    if days as i64 > available {
        return Err(AppError::BadRequest(format!(
            "Requested {days} days but only {available} are available"
        )));
    }

    Ok(days)
}
