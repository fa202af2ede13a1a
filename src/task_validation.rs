use crate::error::PlannerError;
use crate::task::Task;
use std::collections::HashSet;

/// Longest task that can be planned, in days (about a century).
pub const MAX_DURATION: i64 = 36_500;
/// Ceiling for a stretched duration: the longest task at 1% allocation.
pub const MAX_ADJUSTED_DURATION: i64 = MAX_DURATION * 100;

pub fn validate_task(task: &Task) -> Result<(), PlannerError> {
    if task.name.trim().is_empty() {
        return Err(PlannerError::validation(format!(
            "task {} has an empty name",
            task.id
        )));
    }

    if !(1..=MAX_ADJUSTED_DURATION).contains(&task.duration) {
        return Err(PlannerError::validation(format!(
            "task {} has out-of-range duration {}",
            task.id, task.duration
        )));
    }

    if !(1..=MAX_DURATION).contains(&task.original_duration) {
        return Err(PlannerError::validation(format!(
            "task {} has out-of-range original duration {}",
            task.id, task.original_duration
        )));
    }

    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> Result<(), PlannerError> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(PlannerError::validation(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    Ok(())
}

pub fn validate_duration(duration: i64) -> Result<(), PlannerError> {
    if duration < 1 {
        return Err(PlannerError::validation(format!(
            "duration must be at least 1 day (got {duration})"
        )));
    }
    if duration > MAX_DURATION {
        return Err(PlannerError::validation(format!(
            "duration must be at most {MAX_DURATION} days (got {duration})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: i32, duration: i64) -> Task {
        Task::new(id, "T", "R", NaiveDate::from_ymd_opt(2024, 11, 11).unwrap(), duration)
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = validate_task_collection(&[task(1, 1), task(1, 2)]).unwrap_err();
        assert!(err.to_string().contains("duplicate task id 1"));
    }

    #[test]
    fn rejects_zero_duration_and_blank_name() {
        assert!(validate_task(&task(1, 0)).is_err());
        let mut blank = task(2, 1);
        blank.name = "   ".into();
        assert!(validate_task(&blank).is_err());
    }

    #[test]
    fn rejects_durations_beyond_the_planning_horizon() {
        assert!(validate_duration(MAX_DURATION).is_ok());
        assert!(validate_duration(MAX_DURATION + 1).is_err());
        assert!(validate_duration(1_000_000_000).is_err());
        assert!(validate_task(&task(1, i64::MAX / 10)).is_err());

        let mut stretched = task(2, 10);
        stretched.duration = MAX_ADJUSTED_DURATION;
        assert!(validate_task(&stretched).is_ok());
    }
}
