use chrono::NaiveDate;
use gantt_planner::{
    NewTask, PlannerError, Task, TaskKind, TaskStore, calendar, find_next_available_slot,
    insert_task, recalculate_allocation,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn find(tasks: &[Task], id: i32) -> &Task {
    tasks.iter().find(|t| t.id == id).unwrap()
}

fn assert_no_overlap(tasks: &[Task]) {
    for a in tasks {
        for b in tasks {
            if a.id == b.id || a.resource != b.resource {
                continue;
            }
            let disjoint = a.end_date() < b.start_date || b.end_date() < a.start_date;
            assert!(disjoint, "tasks {} and {} overlap", a.id, b.id);
        }
    }
}

fn planned_store() -> TaskStore {
    TaskStore::from_tasks(vec![
        Task::new(1, "Analisi", "Roberto", d(2024, 11, 11), 3),
        Task::new(2, "Sviluppo API", "Roberto", d(2024, 11, 14), 4).with_kind(TaskKind::Development),
        Task::new(3, "Workshop", "Anna", d(2024, 11, 12), 2),
        Task::new(4, "Deploy", "Roberto", d(2024, 11, 20), 1),
    ])
    .unwrap()
}

#[test]
fn slot_follows_the_last_task() {
    let tasks = vec![Task::new(1, "A", "R", d(2024, 11, 11), 3)];
    let slot = find_next_available_slot(&tasks, "R", d(2024, 1, 1));
    assert_eq!(slot.date, d(2024, 11, 14));
    assert_eq!(slot.after_task_id, Some(1));
}

#[test]
fn insert_after_cascades_later_tasks() {
    let tasks = vec![
        Task::new(1, "A", "R", d(2024, 11, 11), 3),
        Task::new(2, "Later", "R", d(2024, 11, 20), 1),
    ];
    let updated = insert_task(&tasks, &NewTask::new("B", "R", 2).after(1), d(2024, 1, 1)).unwrap();

    let inserted = find(&updated, 3);
    assert_eq!(inserted.start_date, d(2024, 11, 14));
    assert_eq!(inserted.end_date(), d(2024, 11, 15));
    assert_eq!(find(&updated, 2).start_date, d(2024, 11, 18));
    assert_no_overlap(&updated);
}

#[test]
fn half_allocation_doubles_duration() {
    let tasks = vec![Task::new(1, "A", "R", d(2024, 11, 11), 5)];
    let updated = recalculate_allocation(&tasks, 50).unwrap();
    assert_eq!(updated[0].duration, 10);
    assert_eq!(updated[0].original_duration, 5);
    assert_eq!(updated[0].start_date, d(2024, 11, 11));
}

#[test]
fn allocation_never_changes_original_duration() {
    let store = planned_store();
    for pct in [100, 80, 70, 60, 50, 33, 1] {
        let updated = store.with_allocation(pct).unwrap();
        for (before, after) in store.tasks().iter().zip(updated.tasks()) {
            assert_eq!(before.id, after.id);
            assert_eq!(after.original_duration, before.original_duration);
            assert!(after.duration >= after.original_duration);
        }
        assert_no_overlap(updated.tasks());
    }
}

#[test]
fn full_allocation_is_idempotent() {
    let once = planned_store().with_allocation(100).unwrap();
    let twice = once.with_allocation(100).unwrap();
    assert_eq!(once, twice);
    for task in once.tasks() {
        assert_eq!(task.duration, task.original_duration);
    }
}

#[test]
fn allocation_can_be_reverted() {
    let store = planned_store();
    let stretched = store.with_allocation(50).unwrap();
    let restored = stretched.with_allocation(100).unwrap();
    let again = store.with_allocation(100).unwrap();
    assert_eq!(restored.tasks(), again.tasks());
}

#[test]
fn resources_never_overlap_after_inserts() {
    let mut store = planned_store();
    let today = d(2024, 11, 8);
    store = store.insert(&NewTask::new("Review", "Roberto", 2).after(1), today).unwrap();
    store = store.insert(&NewTask::new("Hotfix", "Roberto", 1).after(2), today).unwrap();
    store = store.insert(&NewTask::new("Training", "Anna", 3), today).unwrap();
    store = store.insert(&NewTask::new("Kickoff", "Marco", 1), today).unwrap();
    assert_no_overlap(store.tasks());

    let ids: Vec<i32> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    // 2024-11-08 is a Friday: an empty resource starts on the planning date
    assert_eq!(store.find_task(8).unwrap().start_date, d(2024, 11, 8));
}

#[test]
fn slot_moves_forward_as_tasks_are_added() {
    let mut store = TaskStore::new();
    let today = d(2024, 11, 13);
    let mut previous = store.slot("R", today).date;
    for (i, duration) in [1, 3, 2, 5, 1, 4].into_iter().enumerate() {
        store = store
            .insert(&NewTask::new(format!("Task {i}"), "R", duration), today)
            .unwrap();
        let slot = store.slot("R", today);
        assert!(slot.date > previous);
        assert!(calendar::is_workday(slot.date));
        previous = slot.date;
    }
}

#[test]
fn failed_operations_leave_the_store_unchanged() {
    let store = planned_store();
    let before = store.clone();

    let err = store
        .insert(&NewTask::new("X", "Roberto", 1).after(99), d(2024, 1, 1))
        .unwrap_err();
    assert_eq!(err, PlannerError::NotFound(99));
    assert!(store.insert(&NewTask::new("X", "Roberto", 0), d(2024, 1, 1)).is_err());
    assert!(store.with_allocation(0).is_err());
    assert!(store.with_allocation(150).is_err());
    assert_eq!(store, before);
}

#[test]
fn overview_lists_every_resource() {
    let overview = planned_store().overview(d(2024, 11, 1));
    assert_eq!(overview.len(), 2);
    let roberto = &overview[0];
    assert_eq!(roberto.resource, "Roberto");
    assert_eq!(roberto.total_tasks, 3);
    assert_eq!(roberto.last_task_end, Some(d(2024, 11, 20)));
    assert_eq!(roberto.next_available, d(2024, 11, 21));
}

#[test]
fn oversized_durations_are_refused_before_they_reach_the_store() {
    let store = planned_store();
    let err = store
        .insert(&NewTask::new("Big", "Roberto", 1_000_000_000), d(2024, 11, 11))
        .unwrap_err();
    assert!(matches!(err, PlannerError::Validation(_)));
    assert_eq!(store.slot("Roberto", d(2024, 11, 11)).date, d(2024, 11, 21));

    let huge = vec![Task::new(1, "A", "R", d(2024, 11, 11), i64::MAX / 10)];
    assert!(TaskStore::from_tasks(huge.clone()).is_err());
    assert!(matches!(
        recalculate_allocation(&huge, 50),
        Err(PlannerError::Validation(_))
    ));
}
