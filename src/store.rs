use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::calculations::{self, last_finishing, max_id, resource_sequence};
use crate::error::{PlannerError, PlannerResult};
use crate::task::{NewTask, Task, TaskKind};
use crate::task_validation;

/// How incoming tasks combine with the current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    #[default]
    Replace,
    Append,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Replace => f.write_str("replace"),
            MergeMode::Append => f.write_str("append"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(MergeMode::Replace),
            "append" => Ok(MergeMode::Append),
            other => Err(PlannerError::validation(format!(
                "unknown mode '{other}' (expected replace or append)"
            ))),
        }
    }
}

/// Slot summary for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOverview {
    pub resource: String,
    pub total_tasks: usize,
    pub next_available: NaiveDate,
    pub last_task_end: Option<NaiveDate>,
}

/// The task collection every planner operation reads and replaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStore {
    allocation_percentage: u32,
    tasks: Vec<Task>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            allocation_percentage: 100,
            tasks: Vec::new(),
        }
    }

    /// Builds a store from already materialized tasks, rejecting duplicate
    /// ids and invalid durations.
    pub fn from_tasks(tasks: Vec<Task>) -> PlannerResult<Self> {
        task_validation::validate_task_collection(&tasks)?;
        Ok(Self {
            allocation_percentage: 100,
            tasks,
        })
    }

    pub fn from_parts(tasks: Vec<Task>, allocation_percentage: u32) -> PlannerResult<Self> {
        calculations::allocation::validate_percentage(allocation_percentage)?;
        let mut store = Self::from_tasks(tasks)?;
        store.allocation_percentage = allocation_percentage;
        Ok(store)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn allocation_percentage(&self) -> u32 {
        self.allocation_percentage
    }

    pub fn find_task(&self, task_id: i32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn next_id(&self) -> i32 {
        max_id(&self.tasks) + 1
    }

    /// Distinct resources in order of first appearance.
    pub fn resources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .filter(|t| seen.insert(t.resource.as_str()))
            .map(|t| t.resource.clone())
            .collect()
    }

    /// Tasks matching the optional resource and type filters; `None` means all.
    pub fn filtered(&self, resource: Option<&str>, kind: Option<&TaskKind>) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| resource.is_none_or(|r| t.resource == r))
            .filter(|t| kind.is_none_or(|k| &t.kind == k))
            .cloned()
            .collect()
    }

    pub fn resource_overview(&self, resource: &str, today: NaiveDate) -> ResourceOverview {
        let slot = calculations::find_next_available_slot(&self.tasks, resource, today);
        ResourceOverview {
            resource: resource.to_string(),
            total_tasks: resource_sequence(&self.tasks, resource).len(),
            next_available: slot.date,
            last_task_end: last_finishing(&self.tasks, resource).map(Task::end_date),
        }
    }

    pub fn overview(&self, today: NaiveDate) -> Vec<ResourceOverview> {
        self.resources()
            .iter()
            .map(|r| self.resource_overview(r, today))
            .collect()
    }

    pub fn slot(&self, resource: &str, today: NaiveDate) -> calculations::Slot {
        calculations::find_next_available_slot(&self.tasks, resource, today)
    }

    pub fn insert(&self, spec: &NewTask, today: NaiveDate) -> PlannerResult<Self> {
        let tasks = calculations::insert_task(&self.tasks, spec, today)?;
        Ok(Self {
            allocation_percentage: self.allocation_percentage,
            tasks,
        })
    }

    pub fn with_allocation(&self, percentage: u32) -> PlannerResult<Self> {
        let tasks = calculations::recalculate_allocation(&self.tasks, percentage)?;
        Ok(Self {
            allocation_percentage: percentage,
            tasks,
        })
    }

    /// Combines `incoming` with the current tasks. Incoming ids are discarded
    /// and reassigned sequentially, continuing after the current maximum when
    /// appending and from 1 when replacing.
    pub fn merge(&self, incoming: Vec<Task>, mode: MergeMode) -> PlannerResult<Self> {
        let (mut tasks, mut next_id) = match mode {
            MergeMode::Replace => (Vec::with_capacity(incoming.len()), 1),
            MergeMode::Append => (self.tasks.clone(), self.next_id()),
        };
        for mut task in incoming {
            task.id = next_id;
            next_id += 1;
            tasks.push(task);
        }
        task_validation::validate_task_collection(&tasks)?;
        Ok(Self {
            allocation_percentage: self.allocation_percentage,
            tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> TaskStore {
        TaskStore::from_tasks(vec![
            Task::new(1, "A", "Roberto", d(2024, 11, 11), 3),
            Task::new(2, "B", "Anna", d(2024, 11, 12), 2).with_kind(TaskKind::Development),
            Task::new(5, "C", "Roberto", d(2024, 11, 18), 1),
        ])
        .unwrap()
    }

    #[test]
    fn resources_and_filters() {
        let store = sample();
        assert_eq!(store.resources(), vec!["Roberto", "Anna"]);
        assert_eq!(store.filtered(Some("Roberto"), None).len(), 2);
        assert_eq!(store.filtered(None, Some(&TaskKind::Development)).len(), 1);
        assert_eq!(store.filtered(None, None).len(), 3);
        assert_eq!(store.next_id(), 6);
    }

    #[test]
    fn overview_reports_next_slot_and_last_end() {
        let overview = sample().resource_overview("Roberto", d(2024, 1, 1));
        assert_eq!(overview.total_tasks, 2);
        assert_eq!(overview.last_task_end, Some(d(2024, 11, 18)));
        assert_eq!(overview.next_available, d(2024, 11, 19));
    }

    #[test]
    fn overview_reports_the_latest_end_for_overlapping_tasks() {
        let store = TaskStore::from_tasks(vec![
            Task::new(1, "Long", "R", d(2024, 11, 11), 10),
            Task::new(2, "Short", "R", d(2024, 11, 12), 1),
        ])
        .unwrap();
        let overview = store.resource_overview("R", d(2024, 1, 1));
        assert_eq!(overview.last_task_end, Some(d(2024, 11, 20)));
        assert_eq!(overview.next_available, d(2024, 11, 21));
    }

    #[test]
    fn oversized_tasks_are_refused() {
        let err = TaskStore::new()
            .insert(&NewTask::new("Big", "R", 1_000_000_000), d(2024, 11, 11))
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
        assert!(TaskStore::from_tasks(vec![Task::new(1, "Big", "R", d(2024, 11, 11), 99_999_999_999)]).is_err());
    }

    #[test]
    fn failed_insert_leaves_store_untouched() {
        let store = sample();
        let before = store.clone();
        assert!(store.insert(&NewTask::new("X", "Roberto", 1).after(99), d(2024, 1, 1)).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn merge_append_reassigns_ids_after_current_max() {
        let store = sample();
        let incoming = vec![Task::new(1, "New", "Marco", d(2024, 12, 2), 2)];
        let merged = store.merge(incoming.clone(), MergeMode::Append).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.find_task(6).unwrap().name, "New");

        let replaced = store.merge(incoming, MergeMode::Replace).unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced.tasks()[0].id, 1);
    }

    #[test]
    fn allocation_is_remembered() {
        let store = sample().with_allocation(50).unwrap();
        assert_eq!(store.allocation_percentage(), 50);
        assert_eq!(store.find_task(1).unwrap().duration, 6);
        assert!(sample().with_allocation(0).is_err());
    }
}
