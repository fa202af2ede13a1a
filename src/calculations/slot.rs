use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::last_finishing;
use crate::calendar;
use crate::task::Task;

/// Next free start date on a resource's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub date: NaiveDate,
    pub after_task_id: Option<i32>,
}

/// Finds the first workday after every task of the resource has ended.
///
/// The anchor is the task finishing last (ties go to the later start), so
/// overlapping imported tasks cannot pull the slot back. A resource with no
/// tasks gets `today`, rolled forward when it falls on a weekend.
pub fn find_next_available_slot(tasks: &[Task], resource: &str, today: NaiveDate) -> Slot {
    match last_finishing(tasks, resource) {
        Some(last) => Slot {
            date: calendar::next_workday(last.end_date()),
            after_task_id: Some(last.id),
        },
        None => Slot {
            date: calendar::roll_to_workday(today),
            after_task_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn slot_follows_last_task_of_resource() {
        let tasks = vec![
            Task::new(1, "A", "R", d(2024, 11, 11), 3),
            Task::new(2, "B", "Other", d(2024, 12, 2), 10),
        ];
        let slot = find_next_available_slot(&tasks, "R", d(2024, 1, 1));
        assert_eq!(slot.date, d(2024, 11, 14));
        assert_eq!(slot.after_task_id, Some(1));
    }

    #[test]
    fn slot_uses_latest_end_not_collection_order() {
        let tasks = vec![
            Task::new(1, "Late", "R", d(2024, 11, 18), 2),
            Task::new(2, "Early", "R", d(2024, 11, 11), 3),
        ];
        let slot = find_next_available_slot(&tasks, "R", d(2024, 1, 1));
        assert_eq!(slot.after_task_id, Some(1));
        assert_eq!(slot.date, d(2024, 11, 20));
    }

    #[test]
    fn slot_clears_a_long_task_that_overlaps_later_ones() {
        let tasks = vec![
            Task::new(1, "Long", "R", d(2024, 11, 11), 10),
            Task::new(2, "Short", "R", d(2024, 11, 12), 1),
        ];
        let slot = find_next_available_slot(&tasks, "R", d(2024, 1, 1));
        assert_eq!(slot.after_task_id, Some(1));
        assert_eq!(slot.date, d(2024, 11, 21));
    }

    #[test]
    fn empty_resource_starts_today() {
        let slot = find_next_available_slot(&[], "R", d(2024, 11, 13));
        assert_eq!(slot.date, d(2024, 11, 13));
        assert_eq!(slot.after_task_id, None);

        let weekend = find_next_available_slot(&[], "R", d(2024, 11, 16));
        assert_eq!(weekend.date, d(2024, 11, 18));
    }
}
