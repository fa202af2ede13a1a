use super::{PersistenceError, PersistenceResult};
use crate::calendar;
use crate::error::{PlannerError, PlannerResult};
use crate::store::{MergeMode, TaskStore};
use crate::task::{Task, TaskKind};
use crate::task_validation;
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use std::fs;
use std::path::Path;

pub const EXPORT_HEADER: &str = "Name,Resource,StartDate,Duration,Type,Dependencies";

const RICH_TITLE: &str = "Titolo";
const RICH_ASSIGNEE: &str = "Assegnato a";
const RICH_START: &str = "Start Date";
const RICH_END: &str = "Data finale";
const RICH_HOURS: &str = "Ore inizialmente pianificate";
const DEFAULT_PLANNED_HOURS: f64 = 4.0;
const HOURS_PER_DAY: f64 = 8.0;
const MIN_FIELDS: usize = 3;

/// Header shape of an imported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFormat {
    /// `Name,Resource,StartDate,Duration,Type`, read by position.
    Simple,
    /// Project-tool export located by column title.
    RichExport,
}

pub fn detect_format<S: AsRef<str>>(headers: &[S]) -> CsvFormat {
    let is_rich = headers
        .iter()
        .any(|h| matches!(h.as_ref(), RICH_TITLE | RICH_ASSIGNEE | RICH_START));
    if is_rich {
        CsvFormat::RichExport
    } else {
        CsvFormat::Simple
    }
}

struct RichColumns {
    title: Option<usize>,
    assignee: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
    hours: Option<usize>,
}

impl RichColumns {
    fn locate(headers: &[String]) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            title: find(RICH_TITLE),
            assignee: find(RICH_ASSIGNEE),
            start: find(RICH_START),
            end: find(RICH_END),
            hours: find(RICH_HOURS),
        }
    }
}

fn field(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn parse_rich_row(
    row: &[String],
    columns: &RichColumns,
    today: NaiveDate,
    line: u64,
) -> PlannerResult<Task> {
    let name = field(row, columns.title).unwrap_or("Untitled");
    let resource = field(row, columns.assignee).unwrap_or("Unassigned");
    let hours = field(row, columns.hours)
        .and_then(|h| h.replace(',', ".").parse::<f64>().ok())
        .filter(|h| *h != 0.0)
        .unwrap_or(DEFAULT_PLANNED_HOURS);
    let mut duration = ((hours / HOURS_PER_DAY).ceil() as i64).max(1);

    let start_raw = field(row, columns.start);
    let start_date = match start_raw {
        Some(raw) => calendar::parse_date(raw).map_err(|err| at_line(line, err))?,
        None => today,
    };

    if let (Some(start_raw), Some(end_raw)) = (start_raw, field(row, columns.end)) {
        let start = calendar::parse_datetime(start_raw).map_err(|err| at_line(line, err))?;
        let end = calendar::parse_datetime(end_raw).map_err(|err| at_line(line, err))?;
        let span = calendar::span_days(start, end);
        if span > 0 {
            duration = span;
        }
    }
    task_validation::validate_duration(duration).map_err(|err| at_line(line, err))?;

    Ok(Task::new(0, name, resource, start_date, duration))
}

fn parse_simple_row(row: &[String], today: NaiveDate, line: u64) -> PlannerResult<Task> {
    let name = field(row, Some(0)).unwrap_or("Untitled");
    let resource = field(row, Some(1)).unwrap_or("Unassigned");
    let start_date = match field(row, Some(2)) {
        Some(raw) => calendar::parse_date(raw).map_err(|err| at_line(line, err))?,
        None => today,
    };
    let duration = match field(row, Some(3)).and_then(leading_integer) {
        Some(value) => value,
        None => 1,
    };
    task_validation::validate_duration(duration).map_err(|err| at_line(line, err))?;
    let kind = field(row, Some(4)).map(TaskKind::parse).unwrap_or_default();

    Ok(Task::new(0, name, resource, start_date, duration).with_kind(kind))
}

/// Integer prefix of a numeric field, so `3.5` reads as 3.
fn leading_integer(raw: &str) -> Option<i64> {
    let end = raw
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

fn at_line(line: u64, err: PlannerError) -> PlannerError {
    match err {
        PlannerError::Validation(message) => PlannerError::validation(format!("line {line}: {message}")),
        other => other,
    }
}

fn clean(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .map(|value| value.trim_matches('"').trim().to_string())
        .collect()
}

/// Parses CSV text into unnumbered tasks ordered by start date, then resource.
///
/// The first non-blank line is the header. Rows with fewer than three fields
/// are skipped.
pub fn parse_csv(text: &str, today: NaiveDate) -> PlannerResult<Vec<Task>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => clean(&record.map_err(malformed)?),
        None => return Err(PlannerError::empty_input("CSV file has no header line")),
    };

    let format = detect_format(headers.as_slice());
    let rich_columns = RichColumns::locate(&headers);

    let mut tasks = Vec::new();
    for record in records {
        let record = record.map_err(malformed)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = clean(&record);
        if row.len() < MIN_FIELDS {
            continue;
        }
        let task = match format {
            CsvFormat::RichExport => parse_rich_row(&row, &rich_columns, today, line)?,
            CsvFormat::Simple => parse_simple_row(&row, today, line)?,
        };
        tasks.push(task);
    }

    if tasks.is_empty() {
        return Err(PlannerError::empty_input("no valid task rows in CSV"));
    }

    tasks.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.resource.cmp(&b.resource))
    });
    Ok(tasks)
}

fn malformed(err: csv::Error) -> PlannerError {
    PlannerError::validation(format!("malformed CSV: {err}"))
}

pub fn import_csv(
    text: &str,
    store: &TaskStore,
    mode: MergeMode,
    today: NaiveDate,
) -> PlannerResult<TaskStore> {
    let tasks = parse_csv(text, today)?;
    store.merge(tasks, mode)
}

pub fn import_csv_file<P: AsRef<Path>>(
    path: P,
    store: &TaskStore,
    mode: MergeMode,
    today: NaiveDate,
) -> PersistenceResult<TaskStore> {
    let text = fs::read_to_string(path)?;
    Ok(import_csv(&text, store, mode, today)?)
}

/// Renders tasks with a bare header line and every data field quoted.
pub fn export_csv(tasks: &[Task]) -> PersistenceResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for task in tasks {
        let dependencies = task
            .dependencies
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let start_date = calendar::format_date(task.start_date);
        let duration = task.duration.to_string();
        writer.write_record([
            task.name.as_str(),
            task.resource.as_str(),
            start_date.as_str(),
            duration.as_str(),
            task.kind.as_str(),
            dependencies.as_str(),
        ])?;
    }

    let body = writer
        .into_inner()
        .map_err(|err| PersistenceError::Io(err.into_error()))?;
    let body = String::from_utf8(body)
        .map_err(|err| PersistenceError::InvalidData(format!("exported CSV is not UTF-8: {err}")))?;
    Ok(format!("{EXPORT_HEADER}\n{body}"))
}

pub fn export_csv_file<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    fs::write(path, export_csv(tasks)?)?;
    Ok(())
}
