use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::calendar;
use crate::error::{PlannerError, PlannerResult};
use crate::persistence::PersistenceResult;
use crate::store::TaskStore;
use crate::task::Task;
use crate::task_validation;

pub use crate::store::MergeMode as SyncMode;

const HOURS_PER_DAY: f64 = 8.0;

/// Relational value as the backend returns it: `[id, "display name"]`, or a
/// bare id when names were not requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Named(i64, String),
    Bare(i64),
}

impl Reference {
    pub fn id(&self) -> i64 {
        match self {
            Reference::Named(id, _) | Reference::Bare(id) => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Reference::Named(_, name) if !name.trim().is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}

/// One task record read from the external project backend.
///
/// Unset fields may arrive as `false` instead of `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "false_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "false_as_empty")]
    pub user_ids: Vec<Reference>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub date_start: Option<String>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub date_end: Option<String>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub date_deadline: Option<String>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub planned_hours: Option<f64>,
    #[serde(default, deserialize_with = "false_as_empty")]
    pub depend_on_ids: Vec<i64>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub project_id: Option<Reference>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub stage_id: Option<Reference>,
    #[serde(default, deserialize_with = "false_as_empty")]
    pub tag_ids: Vec<Reference>,
}

fn false_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeFalse<T> {
        Flag(bool),
        Value(T),
    }

    match Option::<MaybeFalse<T>>::deserialize(deserializer)? {
        Some(MaybeFalse::Value(value)) => Ok(Some(value)),
        _ => Ok(None),
    }
}

fn false_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    false_as_none(deserializer).map(Option::unwrap_or_default)
}

/// Narrows fetched records to one project and/or records carrying a tag
/// whose name contains `tag_fragment` (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub project_id: Option<i64>,
    pub tag_fragment: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &SourceRecord) -> bool {
        let project_ok = self
            .project_id
            .is_none_or(|wanted| record.project_id.as_ref().map(Reference::id) == Some(wanted));
        let tag_ok = self.tag_fragment.as_deref().is_none_or(|fragment| {
            let fragment = fragment.to_lowercase();
            record
                .tag_ids
                .iter()
                .filter_map(Reference::name)
                .any(|tag| tag.to_lowercase().contains(&fragment))
        });
        project_ok && tag_ok
    }

    pub fn apply(&self, records: Vec<SourceRecord>) -> Vec<SourceRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn duration_from_hours(hours: Option<f64>) -> i64 {
    hours
        .map(|h| (h / HOURS_PER_DAY).ceil() as i64)
        .filter(|days| *days >= 1)
        .unwrap_or(1)
}

fn normalize_record(record: SourceRecord, today: NaiveDate) -> PlannerResult<Task> {
    let context = |err: PlannerError| match err {
        PlannerError::Validation(message) => {
            PlannerError::validation(format!("source record {}: {message}", record.id))
        }
        other => other,
    };

    let resource = record
        .user_ids
        .first()
        .and_then(Reference::name)
        .unwrap_or("Unassigned")
        .to_string();

    let (start_date, duration) = match (
        record.date_start.as_deref(),
        record.date_end.as_deref(),
        record.date_deadline.as_deref(),
    ) {
        (Some(start), Some(end), _) => {
            let start_at = calendar::parse_datetime(start).map_err(context)?;
            let end_at = calendar::parse_datetime(end).map_err(context)?;
            (start_at.date(), calendar::span_days(start_at, end_at).max(1))
        }
        (Some(start), None, _) => (
            calendar::parse_date(start).map_err(context)?,
            duration_from_hours(record.planned_hours),
        ),
        (None, _, Some(deadline)) => {
            let duration = duration_from_hours(record.planned_hours);
            let deadline = calendar::parse_date(deadline).map_err(context)?;
            (calendar::add_days(deadline, -duration), duration)
        }
        (None, _, None) => (today, 1),
    };
    task_validation::validate_duration(duration).map_err(context)?;

    let name = record
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Untitled Task".to_string());

    let mut task = Task::new(0, name, resource, start_date, duration);
    task.dependencies = record
        .depend_on_ids
        .iter()
        .filter_map(|id| i32::try_from(*id).ok())
        .collect();
    task.external_id = Some(record.id);
    task.project_name = record.project_id.as_ref().and_then(Reference::name).map(str::to_string);
    task.stage = record.stage_id.as_ref().and_then(Reference::name).map(str::to_string);
    task.tags = record
        .tag_ids
        .iter()
        .filter_map(Reference::name)
        .map(str::to_string)
        .collect();
    Ok(task)
}

/// Converts backend records into unnumbered tasks.
///
/// Dependencies still hold backend ids; [`sync`] maps them to local ids.
pub fn normalize_records(records: Vec<SourceRecord>, today: NaiveDate) -> PlannerResult<Vec<Task>> {
    records
        .into_iter()
        .map(|record| normalize_record(record, today))
        .collect()
}

/// Folds normalized source tasks into the store.
///
/// Replace discards current tasks. Append keeps them and skips incoming
/// tasks whose `external_id` is already present. New tasks get fresh ids and
/// their dependencies are rewritten from backend ids to local ids; links to
/// records that are not in the plan are dropped.
pub fn sync(store: &TaskStore, mode: SyncMode, source_tasks: Vec<Task>) -> PlannerResult<TaskStore> {
    let (mut known, kept): (HashSet<i64>, usize) = match mode {
        SyncMode::Replace => (HashSet::new(), 0),
        SyncMode::Append => (
            store.tasks().iter().filter_map(|t| t.external_id).collect(),
            store.len(),
        ),
    };

    let received = source_tasks.len();
    let fresh: Vec<Task> = source_tasks
        .into_iter()
        .filter(|task| task.external_id.is_none_or(|ext| known.insert(ext)))
        .collect();
    let skipped = received - fresh.len();

    let merged = store.merge(fresh, mode)?;
    let local_ids: HashMap<i64, i32> = merged
        .tasks()
        .iter()
        .filter_map(|t| t.external_id.map(|ext| (ext, t.id)))
        .collect();

    let (current, added) = merged.tasks().split_at(kept);
    let tasks: Vec<Task> = current
        .iter()
        .cloned()
        .chain(added.iter().map(|task| Task {
            dependencies: task
                .dependencies
                .iter()
                .filter_map(|ext| local_ids.get(&i64::from(*ext)).copied())
                .collect(),
            ..task.clone()
        }))
        .collect();

    tracing::info!(mode = %mode, added = added.len(), skipped, "synchronized tasks from source");
    TaskStore::from_parts(tasks, merged.allocation_percentage())
}

/// Read-only supplier of backend task records.
pub trait TaskSource {
    fn fetch(&self) -> PersistenceResult<Vec<SourceRecord>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourcePayload {
    Records(Vec<SourceRecord>),
    Envelope { result: Vec<SourceRecord> },
}

/// Records saved to disk, either as a bare JSON array or as a JSON-RPC
/// response with the array under `result`.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for JsonFileSource {
    fn fetch(&self) -> PersistenceResult<Vec<SourceRecord>> {
        let file = File::open(&self.path)?;
        let records = match serde_json::from_reader(file)? {
            SourcePayload::Records(records) => records,
            SourcePayload::Envelope { result } => result,
        };
        tracing::debug!(path = %self.path.display(), records = records.len(), "read source records");
        Ok(records)
    }
}
