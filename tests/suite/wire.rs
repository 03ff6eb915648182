//! Wire format tests for configuration messages

use std::time::Duration;

use convsched_types::{
    ActionName, ConvergenceAction, ConvergenceSchedule, ConvergenceScheduleConfiguration,
};
use serde_json::json;

use crate::common::configuration_message;

fn full_schedule() -> serde_json::Value {
    json!({
        "init": [
            {"name": "setDowntime", "params": ["50"]}
        ],
        "stalling": [
            {"action": {"name": "setDowntime", "params": ["150"]}, "limit": 1},
            {"action": {"name": "setDowntime", "params": ["300"]}, "limit": 2},
            {"action": {"name": "postcopy", "params": []}, "limit": 3},
            {"action": {"name": "abort", "params": []}, "limit": -1}
        ]
    })
}

#[test]
fn decodes_configuration_from_reader() {
    let message = configuration_message(&full_schedule(), &json!("500ms"));

    let config =
        ConvergenceScheduleConfiguration::load(message.as_bytes()).expect("valid message");

    assert_eq!(config.monitor_interval(), Duration::from_millis(500));
    assert_eq!(config.schedule().init(), &[ConvergenceAction::set_downtime(50)]);
    assert_eq!(config.schedule().remaining(), 4);
    assert!(config.schedule().has_postcopy());
}

#[test]
fn negative_limit_fires_on_first_tick() {
    let mut schedule = ConvergenceSchedule::decode(
        br#"{"init": [], "stalling": [{"action": {"name": "abort"}, "limit": -1}]}"#,
    )
    .expect("valid schedule");

    assert_eq!(schedule.pop_action(0), Some(ConvergenceAction::abort()));
}

#[test]
fn unknown_names_survive_a_round_trip() {
    let schedule = json!({
        "init": [{"name": "throttleCpu", "params": ["20"]}],
        "stalling": [{"action": {"name": "snapshot"}, "limit": 4}]
    });
    let decoded = ConvergenceSchedule::decode(schedule.to_string().as_bytes()).expect("decodes");

    let reencoded = decoded.encode().expect("encodes");
    let value: serde_json::Value = serde_json::from_slice(&reencoded).expect("json");

    assert_eq!(value["init"][0]["name"], "throttleCpu");
    assert_eq!(value["stalling"][0]["action"]["name"], "snapshot");
    assert_eq!(value["stalling"][0]["action"]["params"], json!([]));
    assert_eq!(
        decoded.init()[0].name(),
        &ActionName::Unknown("throttleCpu".to_owned())
    );
}

#[test]
fn round_trip_after_pops_keeps_remaining_items() {
    let message = configuration_message(&full_schedule(), &json!(1_000_000_000u64));
    let config = ConvergenceScheduleConfiguration::decode(message.as_bytes()).expect("decodes");
    let (mut schedule, interval) = config.into_parts();

    assert!(schedule.pop_action(2).is_some());
    assert!(schedule.pop_action(5).is_some());

    let shrunk = ConvergenceScheduleConfiguration::new(schedule.clone(), interval);
    let encoded = shrunk.encode().expect("encodes");
    let decoded = ConvergenceScheduleConfiguration::decode(&encoded).expect("decodes");

    assert_eq!(decoded.schedule(), &schedule);
    assert_eq!(decoded.schedule().remaining(), 2);
    assert_eq!(decoded.monitor_interval(), Duration::from_secs(1));
}

#[test]
fn rejects_structurally_invalid_messages() {
    let cases = [
        "",
        "[]",
        r#"{"configuration": null}"#,
        r#"{"configuration": {"schedule": {"init": [], "stalling": {}}, "monitorInterval": "1s"}}"#,
        r#"{"configuration": {"schedule": {"init": [{"name": 7}], "stalling": []}, "monitorInterval": "1s"}}"#,
        r#"{"configuration": {"schedule": {"init": [], "stalling": [{"action": {"name": "abort"}, "limit": "5"}]}, "monitorInterval": "1s"}}"#,
        r#"{"configuration": {"schedule": {"init": [], "stalling": []}, "monitorInterval": "fast"}}"#,
        r#"{"configuration": {"schedule": {"init": [], "stalling": []}, "monitorInterval": -5}}"#,
        r#"{"configuration": {"schedule": {"init": [], "stalling": []}, "monitorInterval": 1.5}}"#,
    ];

    for case in cases {
        assert!(
            ConvergenceScheduleConfiguration::decode(case.as_bytes()).is_err(),
            "expected decode failure for {case}"
        );
    }
}
