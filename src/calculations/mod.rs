pub mod allocation;
pub mod insertion;
pub mod slot;

pub use allocation::{ALLOCATION_PRESETS, recalculate_allocation};
pub use insertion::insert_task;
pub use slot::{Slot, find_next_available_slot};

use crate::task::Task;

/// Tasks of `resource` ordered by start date; ties keep collection order.
pub(crate) fn resource_sequence<'a>(tasks: &'a [Task], resource: &str) -> Vec<&'a Task> {
    let mut sequence: Vec<&Task> = tasks.iter().filter(|t| t.resource == resource).collect();
    sequence.sort_by_key(|t| t.start_date);
    sequence
}

/// Task of `resource` with the latest end date, the later start winning ties.
pub(crate) fn last_finishing<'a>(tasks: &'a [Task], resource: &str) -> Option<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.resource == resource)
        .max_by_key(|t| (t.end_date(), t.start_date))
}

/// Highest id in use, or 0 for an empty collection.
pub(crate) fn max_id(tasks: &[Task]) -> i32 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0)
}
