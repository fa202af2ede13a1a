use chrono::NaiveDate;
use gantt_planner::sync::sync;
use gantt_planner::{
    JsonFileSource, RecordFilter, SyncMode, TaskSource, TaskStore, normalize_records,
};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn backend_records() -> serde_json::Value {
    json!([
        {
            "id": 101,
            "name": "Analisi",
            "user_ids": [[7, "Roberto"]],
            "date_start": "2024-11-11 08:00:00",
            "date_end": "2024-11-13 17:00:00",
            "date_deadline": false,
            "planned_hours": 24,
            "depend_on_ids": [],
            "project_id": [1, "Portale"],
            "stage_id": [3, "In corso"],
            "tag_ids": [[5, "Pianificato"]]
        },
        {
            "id": 102,
            "name": "Sviluppo",
            "user_ids": [[7, "Roberto"]],
            "date_start": "2024-11-14 08:00:00",
            "date_end": false,
            "planned_hours": 12,
            "depend_on_ids": [101, 999],
            "project_id": [1, "Portale"],
            "stage_id": false,
            "tag_ids": []
        },
        {
            "id": 103,
            "name": false,
            "user_ids": [],
            "date_start": false,
            "date_end": false,
            "date_deadline": false,
            "planned_hours": false,
            "depend_on_ids": false,
            "project_id": [2, "Interno"],
            "stage_id": false,
            "tag_ids": false
        }
    ])
}

#[test]
fn file_source_reads_bare_arrays_and_envelopes() {
    let dir = tempdir().unwrap();
    let bare = dir.path().join("bare.json");
    let envelope = dir.path().join("envelope.json");
    fs::write(&bare, backend_records().to_string()).unwrap();
    fs::write(
        &envelope,
        json!({ "jsonrpc": "2.0", "id": 1, "result": backend_records() }).to_string(),
    )
    .unwrap();

    let from_bare = JsonFileSource::new(&bare).fetch().unwrap();
    let from_envelope = JsonFileSource::new(&envelope).fetch().unwrap();
    assert_eq!(from_bare.len(), 3);
    assert_eq!(from_bare, from_envelope);
    assert!(from_bare[2].name.is_none());
    assert!(from_bare[2].depend_on_ids.is_empty());
}

#[test]
fn missing_source_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(JsonFileSource::new(dir.path().join("none.json")).fetch().is_err());
}

#[test]
fn replace_sync_maps_dependencies_to_local_ids() {
    let records = serde_json::from_value(backend_records()).unwrap();
    let today = d(2024, 11, 18);
    let tasks = normalize_records(records, today).unwrap();
    let store = sync(&TaskStore::new(), SyncMode::Replace, tasks).unwrap();

    assert_eq!(store.len(), 3);
    let analysis = store.find_task(1).unwrap();
    assert_eq!(analysis.external_id, Some(101));
    assert_eq!(analysis.duration, 3);

    let development = store.find_task(2).unwrap();
    assert_eq!(development.duration, 2);
    assert_eq!(development.dependencies, vec![1]);

    let untitled = store.find_task(3).unwrap();
    assert_eq!(untitled.name, "Untitled Task");
    assert_eq!(untitled.resource, "Unassigned");
    assert_eq!(untitled.start_date, today);
    assert_eq!(untitled.duration, 1);
}

#[test]
fn append_sync_skips_records_already_in_the_plan() {
    let records: Vec<_> = serde_json::from_value(backend_records()).unwrap();
    let today = d(2024, 11, 18);
    let first = sync(
        &TaskStore::new(),
        SyncMode::Replace,
        normalize_records(records[..1].to_vec(), today).unwrap(),
    )
    .unwrap();

    let second = sync(
        &first,
        SyncMode::Append,
        normalize_records(records.clone(), today).unwrap(),
    )
    .unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(second.tasks()[0], first.tasks()[0]);
    let development = second.tasks().iter().find(|t| t.external_id == Some(102)).unwrap();
    assert_eq!(development.id, 2);
    assert_eq!(development.dependencies, vec![1]);

    let again = sync(&second, SyncMode::Append, normalize_records(records, today).unwrap()).unwrap();
    assert_eq!(again, second);
}

#[test]
fn record_filter_narrows_by_project_and_tag() {
    let records: Vec<_> = serde_json::from_value(backend_records()).unwrap();

    let by_project = RecordFilter {
        project_id: Some(1),
        tag_fragment: None,
    };
    assert_eq!(by_project.apply(records.clone()).len(), 2);

    let by_tag = RecordFilter {
        project_id: None,
        tag_fragment: Some("pianif".to_string()),
    };
    let tagged = by_tag.apply(records.clone());
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, 101);

    assert_eq!(RecordFilter::default().apply(records).len(), 3);
}
