#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::{NamedTempFile, tempdir};

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env_remove("GANTT_PLANNER_CONFIG")
        .env_remove("GANTT_PLANNER_STORE_PATH")
        .write_stdin(script.to_string())
        .assert()
}

#[test]
fn cli_adds_and_inserts_tasks() {
    run_cli(
        "today 2024-11-11\nadd Roberto 3 - Analisi\nadd Roberto 1 - Deploy\ninsert 1 2 Sviluppo Review\nquit\n",
    )
    .success()
    .stdout(str_contains("Planning date set to 2024-11-11."))
    .stdout(str_contains("Added task 1 starting 2024-11-11."))
    .stdout(str_contains("Added task 2 starting 2024-11-14."))
    .stdout(str_contains("Inserted task 3 after 1, starting 2024-11-14."));
}

#[test]
fn cli_reports_allocation_changes_and_errors() {
    run_cli("today 2024-11-11\nadd Roberto 5 - Analisi\nalloc 50\nalloc 0\ninsert 9 1 - Missing\nquit\n")
        .success()
        .stdout(str_contains("Allocation set to 50%."))
        .stdout(str_contains("between 1 and 100"))
        .stdout(str_contains("Error: task 9 not found"));
}

#[test]
fn cli_rejects_unknown_commands() {
    run_cli("frobnicate\nquit\n")
        .success()
        .stdout(str_contains("Unknown command. Type 'help'."));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    let script = format!(
        "today 2024-11-11\nadd Roberto 4 - TaskPersist\nsave json {path}\nadd Anna 1 - Temporary\nload json {path}\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Plan saved to"), "expected save confirmation");
    let after_reload = output
        .split("Plan loaded from")
        .last()
        .unwrap_or_default();
    assert!(after_reload.contains("TaskPersist"));
    assert!(
        !after_reload.contains("Temporary"),
        "task added after saving should be gone"
    );
}

#[test]
fn cli_exports_and_imports_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.csv");
    let path = path.to_string_lossy();
    let script = format!(
        "today 2024-11-11\nadd Roberto 2 - Analisi\nadd Anna 1 Sviluppo Setup\nexport {path}\nimport {path} append\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains(format!("Exported 2 tasks to {path}.")))
        .stdout(str_contains(format!("Imported from {path} (append); 4 tasks.")));
}

#[test]
fn cli_records_diagnostics() {
    run_cli("today 2024-11-11\nadd Roberto 1 - Analisi\nlogs\nlogs clear\nquit\n")
        .success()
        .stdout(str_contains("[TASKS] task added"))
        .stdout(str_contains("LOG SUMMARY"))
        .stdout(str_contains("Logs cleared."));
}

#[test]
#[allow(deprecated)]
fn cli_sync_names_the_configured_backend() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    std::fs::write(
        &path,
        r#"[{"id": 7, "name": "Setup", "user_ids": [[1, "Anna"]], "date_start": "2024-11-12"}]"#,
    )
    .unwrap();
    let script = format!("sync {} replace\nlogs\nquit\n", path.to_string_lossy());

    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env_remove("GANTT_PLANNER_CONFIG")
        .env_remove("GANTT_PLANNER_STORE_PATH")
        .env("GANTT_PLANNER_SOURCE_URL", "https://erp.example.com")
        .env("GANTT_PLANNER_SOURCE_DATABASE", "prod")
        .env("GANTT_PLANNER_SOURCE_USERNAME", "planner")
        .env("GANTT_PLANNER_SOURCE_PASSWORD", "secret")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(str_contains("1 tasks."))
        .stdout(str_contains("[SYNC] mirroring source backend from file"));
}
