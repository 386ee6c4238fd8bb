//! Day-bucketing of raw fichajes into worked hours per local calendar day.

use crate::model::attendance::{AttendanceEvent, DayGroup, EventKind, EventStatus};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

#[derive(Default)]
struct DayAccumulator {
    first_entrance: Option<NaiveTime>,
    last_exit: Option<NaiveTime>,
    open_entrance: Option<DateTime<Tz>>,
    open_pause: Option<DateTime<Tz>>,
    worked_secs: i64,
    paused_secs: i64,
}

fn hours_1dp(secs: i64) -> f64 {
    (secs as f64 / 360.0).round() / 10.0
}

/// Groups one employee's events by local date and sums entrance/exit pairs.
///
/// Within a day the most recent unmatched entrance is paired with the next
/// exit. Trailing entrances and orphan exits contribute nothing. Pause pairs
/// are summed separately and are not subtracted from the worked total.
/// Only approved events are considered; pairs never span midnight.
pub fn group_by_day(events: &[AttendanceEvent], tz: &Tz) -> Vec<DayGroup> {
    let mut ordered: Vec<&AttendanceEvent> = events
        .iter()
        .filter(|e| e.status == EventStatus::Approved)
        .collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for event in ordered {
        let local = event.timestamp.with_timezone(tz);
        let day = days.entry(local.date_naive()).or_default();

        match event.kind {
            EventKind::Entrance => {
                day.first_entrance.get_or_insert(local.time());
                day.open_entrance = Some(local);
            }
            EventKind::Exit => {
                if let Some(start) = day.open_entrance.take() {
                    day.worked_secs += (local - start).num_seconds();
                    day.last_exit = Some(local.time());
                }
            }
            EventKind::PauseStart => day.open_pause = Some(local),
            EventKind::PauseEnd => {
                if let Some(start) = day.open_pause.take() {
                    day.paused_secs += (local - start).num_seconds();
                }
            }
        }
    }

    days.into_iter()
        .map(|(date, day)| DayGroup {
            date,
            entrance: day.first_entrance,
            exit: day.last_exit,
            total_hours: hours_1dp(day.worked_secs),
            pause_hours: hours_1dp(day.paused_secs),
        })
        .collect()
}

fn local_midnight_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// UTC bounds `[start, end)` covering the local dates `from..=to`.
pub fn utc_bounds(tz: &Tz, from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = to.succ_opt().unwrap_or(to);
    (local_midnight_utc(tz, from), local_midnight_utc(tz, end))
}
