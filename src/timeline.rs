use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calendar;
use crate::error::PlannerError;
use crate::task::Task;

/// Time scale of the rendered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "year" => Ok(Granularity::Year),
            other => Err(PlannerError::validation(format!(
                "unknown granularity '{other}'"
            ))),
        }
    }
}

/// Inclusive span of dates shown on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

impl DateRange {
    pub fn new(min_date: NaiveDate, max_date: NaiveDate) -> Self {
        Self { min_date, max_date }
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.min_date
            .iter_days()
            .take_while(|date| *date <= self.max_date)
            .collect()
    }

    pub fn len_days(&self) -> i64 {
        (self.max_date - self.min_date).num_days() + 1
    }
}

/// One cell of the grid's header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub label: String,
    pub sublabel: String,
    pub span_width: f64,
}

/// Visible span for a task set.
///
/// An explicit week pins the range to that Monday..Sunday; otherwise the
/// tasks are padded by two days before and a week after.
pub fn compute_range(tasks: &[Task], explicit_week: Option<NaiveDate>, today: NaiveDate) -> DateRange {
    if let Some(week) = explicit_week {
        let start = calendar::week_start(week);
        return DateRange::new(start, calendar::add_days(start, 6));
    }

    let min_start = tasks.iter().map(|t| t.start_date).min();
    let max_end = tasks.iter().map(Task::end_date).max();
    match (min_start, max_end) {
        (Some(min), Some(max)) => {
            DateRange::new(calendar::add_days(min, -2), calendar::add_days(max, 7))
        }
        _ => DateRange::new(today, calendar::add_days(today, 14)),
    }
}

/// Width of one day in grid units. Coarse scales use fixed approximations.
pub fn column_width(granularity: Granularity) -> f64 {
    match granularity {
        Granularity::Day => 1.0,
        Granularity::Week => 1.0 / 7.0,
        Granularity::Month => 1.0 / 30.0,
        Granularity::Quarter => 1.0 / 91.0,
        Granularity::Year => 1.0 / 365.0,
    }
}

/// Days between the start of the grid and the task's start, never negative.
pub fn task_offset(task: &Task, min_date: NaiveDate) -> i64 {
    (task.start_date - min_date).num_days().max(0)
}

pub fn task_span(task: &Task, granularity: Granularity) -> f64 {
    task.duration as f64 * column_width(granularity)
}

pub fn group_header_labels(range: &DateRange, granularity: Granularity) -> Vec<HeaderCell> {
    let unit = column_width(granularity);
    let mut cells: Vec<HeaderCell> = Vec::new();
    let mut current_key: Option<(i32, u32)> = None;

    for date in range.days() {
        let key = header_key(date, granularity);
        if current_key == Some(key) {
            if let Some(cell) = cells.last_mut() {
                cell.span_width += unit;
            }
            continue;
        }
        current_key = Some(key);
        let (label, sublabel) = header_text(date, granularity);
        cells.push(HeaderCell {
            label,
            sublabel,
            span_width: unit,
        });
    }
    cells
}

fn header_key(date: NaiveDate, granularity: Granularity) -> (i32, u32) {
    match granularity {
        Granularity::Day => (date.year(), date.ordinal()),
        Granularity::Week => (date.iso_week().year(), calendar::week_number(date)),
        Granularity::Month => (date.year(), date.month()),
        Granularity::Quarter => (date.year(), quarter(date)),
        Granularity::Year => (date.year(), 0),
    }
}

fn header_text(date: NaiveDate, granularity: Granularity) -> (String, String) {
    match granularity {
        Granularity::Day => (
            date.format("%d/%m").to_string(),
            date.format("%a").to_string(),
        ),
        Granularity::Week => (
            format!("W{}", calendar::week_number(date)),
            format!(
                "{} - {}",
                calendar::week_start(date).format("%d/%m"),
                calendar::week_end(date).format("%d/%m")
            ),
        ),
        Granularity::Month => (date.format("%B").to_string(), date.year().to_string()),
        Granularity::Quarter => (format!("Q{}", quarter(date)), date.year().to_string()),
        Granularity::Year => (date.year().to_string(), String::new()),
    }
}

fn quarter(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_pads_task_span() {
        let tasks = vec![
            Task::new(1, "A", "R", d(2024, 11, 11), 3),
            Task::new(2, "B", "S", d(2024, 11, 14), 5),
        ];
        let range = compute_range(&tasks, None, d(2024, 1, 1));
        assert_eq!(range.min_date, d(2024, 11, 9));
        assert_eq!(range.max_date, d(2024, 11, 25));
    }

    #[test]
    fn explicit_week_overrides_tasks() {
        let tasks = vec![Task::new(1, "A", "R", d(2024, 11, 11), 3)];
        let range = compute_range(&tasks, Some(d(2024, 12, 5)), d(2024, 1, 1));
        assert_eq!(range, DateRange::new(d(2024, 12, 2), d(2024, 12, 8)));
        assert_eq!(range.days().len(), 7);
    }

    #[test]
    fn empty_tasks_show_two_weeks_from_today() {
        let range = compute_range(&[], None, d(2024, 11, 13));
        assert_eq!(range, DateRange::new(d(2024, 11, 13), d(2024, 11, 27)));
        assert_eq!(range.len_days(), 15);
    }

    #[test]
    fn offset_is_clamped_at_zero() {
        let task = Task::new(1, "A", "R", d(2024, 11, 11), 3);
        assert_eq!(task_offset(&task, d(2024, 11, 9)), 2);
        assert_eq!(task_offset(&task, d(2024, 11, 20)), 0);
    }

    #[test]
    fn week_headers_group_days_by_iso_week() {
        // Sat 9 Nov .. Wed 20 Nov: W45 (2 days), W46 (7 days), W47 (3 days)
        let range = DateRange::new(d(2024, 11, 9), d(2024, 11, 20));
        let cells = group_header_labels(&range, Granularity::Week);
        let labels: Vec<&str> = cells.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["W45", "W46", "W47"]);
        assert!((cells[0].span_width - 2.0 / 7.0).abs() < 1e-9);
        assert!((cells[1].span_width - 1.0).abs() < 1e-9);
        assert_eq!(cells[1].sublabel, "11/11 - 17/11");
    }

    #[test]
    fn month_and_quarter_headers() {
        let range = DateRange::new(d(2024, 9, 29), d(2024, 10, 2));
        let months = group_header_labels(&range, Granularity::Month);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label, "September");
        assert_eq!(months[1].label, "October");

        let quarters = group_header_labels(&range, Granularity::Quarter);
        assert_eq!(quarters[0].label, "Q3");
        assert_eq!(quarters[1].label, "Q4");
        assert_eq!(quarters[1].sublabel, "2024");
    }

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("Quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert!("fortnight".parse::<Granularity>().is_err());
    }
}
