use chrono::NaiveDate;
use std::collections::HashMap;

use super::{find_next_available_slot, max_id, resource_sequence};
use crate::calendar;
use crate::error::{PlannerError, PlannerResult};
use crate::task::{NewTask, Task};
use crate::task_validation;

/// Places a new task on its resource's timeline and returns the new collection.
///
/// Without `insert_after` the task is appended at the resource's next free
/// slot. With it, the task starts on the workday after the anchor ends and
/// every later task of the same resource is shifted forward to follow it.
/// On error the input is left as it was.
pub fn insert_task(tasks: &[Task], spec: &NewTask, today: NaiveDate) -> PlannerResult<Vec<Task>> {
    if spec.name.trim().is_empty() {
        return Err(PlannerError::validation("task name must not be blank"));
    }
    task_validation::validate_duration(spec.duration)?;

    let anchor = match spec.insert_after {
        Some(anchor_id) => {
            let anchor = tasks
                .iter()
                .find(|t| t.id == anchor_id)
                .ok_or(PlannerError::NotFound(anchor_id))?;
            if anchor.resource != spec.resource {
                return Err(PlannerError::validation(format!(
                    "task {} is assigned to '{}', not '{}'",
                    anchor.id, anchor.resource, spec.resource
                )));
            }
            Some(anchor)
        }
        None => None,
    };

    let start_date = match anchor {
        Some(anchor) => calendar::next_workday(anchor.end_date()),
        None => find_next_available_slot(tasks, &spec.resource, today).date,
    };

    let mut new_task = Task::new(
        max_id(tasks) + 1,
        spec.name.clone(),
        spec.resource.clone(),
        start_date,
        spec.duration,
    )
    .with_kind(spec.kind.clone());
    new_task.dependencies = spec.insert_after.into_iter().collect();

    let shifts = match anchor {
        Some(anchor) => cascade_shifts(tasks, anchor, &new_task),
        None => HashMap::new(),
    };

    let mut updated: Vec<Task> = tasks
        .iter()
        .map(|task| match shifts.get(&task.id) {
            Some(&start_date) => Task {
                start_date,
                ..task.clone()
            },
            None => task.clone(),
        })
        .collect();
    updated.push(new_task);
    Ok(updated)
}

/// New start dates for the anchor's same-resource successors, chained from
/// the end of the inserted task in their existing order.
fn cascade_shifts(tasks: &[Task], anchor: &Task, inserted: &Task) -> HashMap<i32, NaiveDate> {
    let chain_start = calendar::next_workday(inserted.end_date());
    let (shifts, _) = resource_sequence(tasks, &anchor.resource)
        .into_iter()
        .filter(|t| t.id != anchor.id && t.start_date > anchor.start_date)
        .fold(
            (HashMap::new(), chain_start),
            |(mut shifts, cursor), task| {
                shifts.insert(task.id, cursor);
                let next = calendar::next_workday(calendar::end_date(cursor, task.duration));
                (shifts, next)
            },
        );
    shifts
}
