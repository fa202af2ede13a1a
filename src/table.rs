use chrono::NaiveDate;
use polars::prelude::*;

use crate::calendar;
use crate::store::ResourceOverview;
use crate::task::Task;
use crate::timeline::{self, DateRange, Granularity};

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn date_to_i32(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn date_from_i32(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(i64::from(days))
}

fn date_series(name: &'static str, values: Vec<Option<i32>>) -> PolarsResult<Series> {
    Series::new(PlSmallStr::from_static(name), values).cast(&DataType::Date)
}

/// One row per task, in collection order.
pub fn tasks_frame(tasks: &[Task]) -> PolarsResult<DataFrame> {
    let ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();
    let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let resources: Vec<&str> = tasks.iter().map(|t| t.resource.as_str()).collect();
    let kinds: Vec<&str> = tasks.iter().map(|t| t.kind.as_str()).collect();
    let starts = tasks.iter().map(|t| Some(date_to_i32(t.start_date))).collect();
    let ends = tasks.iter().map(|t| Some(date_to_i32(t.end_date()))).collect();
    let durations: Vec<i64> = tasks.iter().map(|t| t.duration).collect();
    let originals: Vec<i64> = tasks.iter().map(|t| t.original_duration).collect();
    let dependencies: Vec<String> = tasks
        .iter()
        .map(|t| {
            t.dependencies
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    let columns: Vec<Column> = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into(),
        Series::new(PlSmallStr::from_static("name"), names).into(),
        Series::new(PlSmallStr::from_static("resource"), resources).into(),
        Series::new(PlSmallStr::from_static("type"), kinds).into(),
        date_series("start_date", starts)?.into(),
        date_series("end_date", ends)?.into(),
        Series::new(PlSmallStr::from_static("duration"), durations).into(),
        Series::new(PlSmallStr::from_static("original_duration"), originals).into(),
        Series::new(PlSmallStr::from_static("dependencies"), dependencies).into(),
    ];
    DataFrame::new(columns)
}

pub fn overview_frame(rows: &[ResourceOverview]) -> PolarsResult<DataFrame> {
    let resources: Vec<&str> = rows.iter().map(|r| r.resource.as_str()).collect();
    let totals: Vec<i64> = rows.iter().map(|r| r.total_tasks as i64).collect();
    let next = rows.iter().map(|r| Some(date_to_i32(r.next_available))).collect();
    let last = rows.iter().map(|r| r.last_task_end.map(date_to_i32)).collect();

    let columns: Vec<Column> = vec![
        Series::new(PlSmallStr::from_static("resource"), resources).into(),
        Series::new(PlSmallStr::from_static("total_tasks"), totals).into(),
        date_series("next_available", next)?.into(),
        date_series("last_task_end", last)?.into(),
    ];
    DataFrame::new(columns)
}

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Date(days) => calendar::format_date(date_from_i32(*days)),
        other => other.to_string(),
    }
}

/// Boxed plain-text rendering of a frame.
pub fn render_frame_as_text(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let rows: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| {
            columns
                .iter()
                .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = names.iter().map(|n| n.chars().count()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            let pad = widths[ci].saturating_sub(cell.chars().count());
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

/// Text chart: the header groups for `granularity`, then one bar per task
/// with a character per day of `range` (`#` on workdays, `=` on weekends).
pub fn render_timeline_text(tasks: &[Task], range: &DateRange, granularity: Granularity) -> String {
    let label_width = tasks
        .iter()
        .map(|t| t.name.chars().count() + t.resource.chars().count() + 3)
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = format!("{} .. {} ({granularity})\n", range.min_date, range.max_date);
    for cell in timeline::group_header_labels(range, granularity) {
        let days = (cell.span_width / timeline::column_width(granularity)).round() as usize;
        let sublabel = if cell.sublabel.is_empty() {
            String::new()
        } else {
            format!(" {}", cell.sublabel)
        };
        out.push_str(&format!("  {}{sublabel}: {days}d\n", cell.label));
    }

    let days = range.days();
    for task in tasks {
        let label = format!("{} [{}]", task.name, task.resource);
        let bar: String = days
            .iter()
            .map(|day| {
                if *day < task.start_date || *day > task.end_date() {
                    '.'
                } else if calendar::is_weekend(*day) {
                    '='
                } else {
                    '#'
                }
            })
            .collect();
        out.push_str(&format!("{label:<label_width$} |{bar}|\n"));
    }
    out
}
