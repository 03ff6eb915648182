//! End-to-end tests for the convsched binary

use serde_json::json;

use crate::common::{configuration_message, run_convsched, stdout_records, write_message};

fn error_records(records: &[serde_json::Value]) -> Vec<&serde_json::Value> {
    records
        .iter()
        .filter(|record| record["contentType"] == "error")
        .collect()
}

#[test]
fn show_prints_schedule_summary() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = json!({
        "init": [{"name": "setDowntime", "params": ["100"]}],
        "stalling": [{"action": {"name": "postcopy", "params": []}, "limit": 3}]
    });
    let path = write_message(
        dir.path(),
        "plan.json",
        &configuration_message(&schedule, &json!("2s")),
    );

    let output = run_convsched(dir.path(), &["show", path.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("{ init=[setDowntime(100)] stalling=[postcopy()@3] }"));
    assert!(stdout.contains("monitor interval: 2s"));
    assert!(stdout.contains("post-copy:        true"));
}

#[test]
fn run_completes_after_post_copy() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = json!({
        "init": [],
        "stalling": [
            {"action": {"name": "setDowntime", "params": ["100"]}, "limit": 1},
            {"action": {"name": "postcopy", "params": []}, "limit": 3}
        ]
    });
    let path = write_message(
        dir.path(),
        "plan.json",
        &configuration_message(&schedule, &json!("10ms")),
    );

    let output = run_convsched(dir.path(), &["run", path.to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let records = stdout_records(&output);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record["contentType"] == "status"));
    assert_eq!(records[0]["status"]["action"], "setDowntime(100)");
    assert_eq!(records[0]["status"]["iteration"], 2);
    assert_eq!(records[1]["status"]["action"], "postcopy()");
    assert_eq!(records[1]["status"]["iteration"], 4);
}

#[test]
fn scheduled_abort_emits_exactly_one_error_record() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = json!({
        "init": [],
        "stalling": [{"action": {"name": "abort", "params": []}, "limit": 2}]
    });
    let path = write_message(
        dir.path(),
        "plan.json",
        &configuration_message(&schedule, &json!(1_000_000)),
    );

    let output = run_convsched(dir.path(), &["run", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let records = stdout_records(&output);
    let errors = error_records(&records);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["error"]["code"], 5);
    assert_eq!(errors[0]["error"]["message"], "migration aborted");
    assert_eq!(records.last(), Some(errors[0]));
}

#[test]
fn malformed_message_aborts_with_malformed_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_message(dir.path(), "plan.json", r#"{"configuration": {"schedule": {}}}"#);

    let output = run_convsched(dir.path(), &["run", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let records = stdout_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["error"]["code"], 2);
    assert_eq!(records[0]["error"]["message"], "malformed parameters");
}

#[test]
fn bad_downtime_parameter_aborts_before_reaching_the_controller() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = json!({
        "init": [{"name": "setDowntime", "params": ["lots"]}],
        "stalling": []
    });
    let path = write_message(
        dir.path(),
        "plan.json",
        &configuration_message(&schedule, &json!("1s")),
    );

    let output = run_convsched(dir.path(), &["run", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let records = stdout_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["error"]["code"], 2);
    assert!(
        records[0]["error"]["details"]
            .as_str()
            .is_some_and(|details| details.contains("lots"))
    );
}

#[test]
fn exhausted_budget_reports_migration_failed() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = json!({"init": [], "stalling": []});
    let path = write_message(
        dir.path(),
        "plan.json",
        &configuration_message(&schedule, &json!("1s")),
    );

    let output = run_convsched(
        dir.path(),
        &["run", path.to_str().unwrap(), "--iterations", "3"],
    );

    assert_eq!(output.status.code(), Some(1));
    let records = stdout_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["error"]["code"], 4);
}

#[test]
fn missing_file_aborts_with_missing_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");

    let output = run_convsched(dir.path(), &["show", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let records = stdout_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["error"]["code"], 3);
}

#[test]
fn unknown_command_exits_with_usage() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_convsched(dir.path(), &["launch"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage:"));
}
