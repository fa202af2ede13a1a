use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar;

/// Display category of a task. Two labels are recognised; anything else is
/// carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    #[default]
    Consulting,
    Development,
    Other(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Consulting => "Consulenza",
            TaskKind::Development => "Sviluppo",
            TaskKind::Other(label) => label.as_str(),
        }
    }

    /// Parses a type label; blank input yields the default kind.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "consulenza" | "consulting" => TaskKind::Consulting,
            "sviluppo" | "development" => TaskKind::Development,
            _ => TaskKind::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TaskKind {
    fn from(value: String) -> Self {
        TaskKind::parse(&value)
    }
}

impl From<TaskKind> for String {
    fn from(value: TaskKind) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TaskWire")]
pub struct Task {
    pub id: i32,
    pub name: String,
    pub resource: String,
    pub start_date: NaiveDate,
    pub duration: i64,
    pub original_duration: i64,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub dependencies: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Task {
    pub fn new(
        id: i32,
        name: impl Into<String>,
        resource: impl Into<String>,
        start_date: NaiveDate,
        duration: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            resource: resource.into(),
            start_date,
            duration,
            original_duration: duration,
            kind: TaskKind::default(),
            dependencies: Vec::new(),
            external_id: None,
            project_name: None,
            stage: None,
            tags: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn end_date(&self) -> NaiveDate {
        calendar::end_date(self.start_date, self.duration)
    }
}

/// Accepts records that predate `originalDuration` by defaulting it to `duration`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskWire {
    id: i32,
    name: String,
    resource: String,
    start_date: NaiveDate,
    duration: i64,
    #[serde(default)]
    original_duration: Option<i64>,
    #[serde(rename = "type", default)]
    kind: TaskKind,
    #[serde(default)]
    dependencies: Vec<i32>,
    #[serde(default)]
    external_id: Option<i64>,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<TaskWire> for Task {
    fn from(wire: TaskWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            resource: wire.resource,
            start_date: wire.start_date,
            duration: wire.duration,
            original_duration: wire.original_duration.unwrap_or(wire.duration),
            kind: wire.kind,
            dependencies: wire.dependencies,
            external_id: wire.external_id,
            project_name: wire.project_name,
            stage: wire.stage,
            tags: wire.tags,
        }
    }
}

/// Request to place a new task on a resource's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    pub resource: String,
    pub duration: i64,
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub insert_after: Option<i32>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, resource: impl Into<String>, duration: i64) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            duration,
            kind: TaskKind::default(),
            insert_after: None,
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn after(mut self, task_id: i32) -> Self {
        self.insert_after = Some(task_id);
        self
    }
}
