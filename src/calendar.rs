use bdays::HolidayCalendar;
use bdays::calendars::WeekendsOnly;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{PlannerError, PlannerResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Last day a task occupies; `duration` counts the start day itself.
pub fn end_date(start: NaiveDate, duration: i64) -> NaiveDate {
    add_days(start, duration.saturating_sub(1))
}

/// `date` shifted by `days`, clamped to the representable date range.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

pub fn is_weekend(date: NaiveDate) -> bool {
    !is_workday(date)
}

pub fn is_workday(date: NaiveDate) -> bool {
    WeekendsOnly.is_bday(date)
}

/// First workday strictly after `date`.
/// Stays on the last representable day when there is nothing after it.
pub fn next_workday(date: NaiveDate) -> NaiveDate {
    let mut current = date;
    while let Some(next) = current.succ_opt() {
        current = next;
        if is_workday(current) {
            break;
        }
    }
    current
}

/// Rolls `date` forward to a workday, leaving workdays untouched.
pub fn roll_to_workday(date: NaiveDate) -> NaiveDate {
    if is_workday(date) {
        date
    } else {
        next_workday(date)
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

/// Sunday of the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    add_days(week_start(date), 6)
}

/// ISO-8601 week number: the week belongs to the year of its Thursday.
pub fn week_number(date: NaiveDate) -> u32 {
    let thursday = add_days(date, 3 - i64::from(date.weekday().num_days_from_monday()));
    1 + thursday.ordinal0() / 7
}

/// Parses an ISO date, discarding any time-of-day suffix
/// (`2025-11-11 14:00:00` and `2025-11-11T14:00:00Z` both yield `2025-11-11`).
pub fn parse_date(input: &str) -> PlannerResult<NaiveDate> {
    let trimmed = input.trim();
    let date_part = trimmed
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|err| PlannerError::validation(format!("invalid date '{trimmed}': {err}")))
}

/// Parses a timestamp such as `2025-11-11 14:00:00`; a bare date is taken
/// as midnight.
pub fn parse_datetime(input: &str) -> PlannerResult<NaiveDateTime> {
    let trimmed = input.trim().trim_end_matches('Z');
    let parsed = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok());
    match parsed {
        Some(datetime) => Ok(datetime),
        None => parse_date(trimmed).map(|date| date.and_time(NaiveTime::MIN)),
    }
}

/// Whole days covered by the interval, rounded up, regardless of order.
pub fn span_days(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let seconds = (end - start).num_seconds().abs();
    (seconds + 86_399) / 86_400
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
