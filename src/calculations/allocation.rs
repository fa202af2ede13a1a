use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::calendar;
use crate::error::{PlannerError, PlannerResult};
use crate::task::Task;

/// Allocation levels offered to users; any value in `1..=100` is accepted.
pub const ALLOCATION_PRESETS: [u32; 5] = [100, 80, 70, 60, 50];

pub fn validate_percentage(percentage: u32) -> PlannerResult<()> {
    if percentage == 0 || percentage > 100 {
        return Err(PlannerError::validation(format!(
            "allocation percentage must be between 1 and 100 (got {percentage})"
        )));
    }
    Ok(())
}

/// `ceil(original / (percentage / 100))` without floating point rounding.
pub fn adjusted_duration(original_duration: i64, percentage: u32) -> PlannerResult<i64> {
    let pct = i64::from(percentage);
    original_duration
        .checked_mul(100)
        .and_then(|scaled| scaled.checked_add(pct - 1))
        .map(|scaled| scaled / pct)
        .ok_or_else(|| {
            PlannerError::validation(format!(
                "duration {original_duration} is too large to recalculate"
            ))
        })
}

/// Stretches every task to the given allocation and re-lays each resource's
/// tasks back to back from its first task's start date.
///
/// Gaps between a resource's tasks are not preserved, even at 100%.
pub fn recalculate_allocation(tasks: &[Task], percentage: u32) -> PlannerResult<Vec<Task>> {
    validate_percentage(percentage)?;

    let mut groups: Vec<Vec<&Task>> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        let idx = *group_of.entry(task.resource.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(task);
    }

    let layouts: Vec<Vec<(i32, (NaiveDate, i64))>> = groups
        .into_par_iter()
        .map(|mut sequence| {
            sequence.sort_by_key(|t| t.start_date);
            layout_sequence(&sequence, percentage)
        })
        .collect::<PlannerResult<_>>()?;
    let placements: HashMap<i32, (NaiveDate, i64)> = layouts.into_iter().flatten().collect();

    Ok(tasks
        .iter()
        .map(|task| match placements.get(&task.id) {
            Some(&(start_date, duration)) => Task {
                start_date,
                duration,
                ..task.clone()
            },
            None => task.clone(),
        })
        .collect())
}

fn layout_sequence(
    sequence: &[&Task],
    percentage: u32,
) -> PlannerResult<Vec<(i32, (NaiveDate, i64))>> {
    let Some(first) = sequence.first() else {
        return Ok(Vec::new());
    };
    let mut cursor = first.start_date;
    let mut placed = Vec::with_capacity(sequence.len());
    for task in sequence {
        let duration = adjusted_duration(task.original_duration, percentage)?;
        placed.push((task.id, (cursor, duration)));
        cursor = calendar::next_workday(calendar::end_date(cursor, duration));
    }
    Ok(placed)
}
