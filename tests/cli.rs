//! CLI integration tests.
//!
//! Uses `assert_cmd` to run the `hazard-console` binary on scenario files
//! written to a temporary directory.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCENARIO: &str = r#"{
    "settings": {
        "sorts": [{"attributeIdentifier": "hazardType", "direction": "ascending", "priority": 1}]
    },
    "events": [
        {"eventId": "HZ-0001", "startTime": 0, "endTime": 3600000, "status": "ISSUED",
         "phenomenon": "FF", "significance": "W", "persistedAt": [60000],
         "attributes": {"headline": "Flash flood warning"}},
        {"eventId": "HZ-0002", "startTime": 600000, "endTime": 4200000,
         "phenomenon": "FL", "significance": "W"}
    ],
    "steps": [
        {"action": "add", "event": {"eventId": "HZ-0003", "startTime": 0, "endTime": 60000,
                                    "phenomenon": "FF", "significance": "W"}},
        {"action": "sort", "sorts": [{"attributeIdentifier": "hazardType", "direction": "descending", "priority": 1}]},
        {"action": "timers", "timers": {"HZ-0002": {"expireTime": 90000}}}
    ]
}"#;

fn hazard_console() -> Command {
    cargo_bin_cmd!("hazard-console")
}

fn write_scenario(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("scenario.json");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn help_exits_0_with_description() {
    hazard_console()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("console table"));
}

#[test]
fn prints_rows_in_sorted_order() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(&dir, SCENARIO);

    let output = hazard_console().arg(&path).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

    let positions: Vec<usize> = ["HZ-0002", "HZ-0003", "HZ-0001"]
        .iter()
        .map(|id| stdout.find(id).unwrap())
        .collect();
    assert!(positions[0] < positions[1] && positions[1] < positions[2]);
    assert!(stdout.contains("Flash flood warning"));
    assert!(stdout.contains("01:30"));
}

#[test]
fn show_history_adds_child_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(&dir, SCENARIO);

    hazard_console()
        .arg(&path)
        .arg("--show-history")
        .assert()
        .success()
        .stdout(predicate::str::contains("└── HZ-0001"));
}

#[test]
fn trace_view_lists_operations() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(&dir, SCENARIO);

    hazard_console()
        .arg(&path)
        .arg("--trace-view")
        .assert()
        .success()
        .stdout(predicate::str::contains("insert HZ-0003 at 1"))
        .stdout(predicate::str::contains("set all [HZ-0002, HZ-0003, HZ-0001]"));
}

#[test]
fn log_file_is_written() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(&dir, SCENARIO);
    let log = dir.path().join("console.log");

    hazard_console()
        .arg(&path)
        .arg("--log")
        .arg(&log)
        .arg("--verbose")
        .assert()
        .success();

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Starting Hazard Console"));
}

#[test]
fn missing_scenario_fails() {
    hazard_console()
        .arg("/nonexistent/scenario.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load scenario"));
}

#[test]
fn historical_edit_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(
        &dir,
        r#"{
            "settings": {"showHistoryList": true},
            "events": [{"eventId": "HZ-0001", "startTime": 0, "endTime": 60000, "persistedAt": [1000]}],
            "steps": [{"action": "edit", "rows": [{"identifier": "HZ-0001", "historyIndex": 0, "checked": true}]}]
        }"#,
    );

    hazard_console()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Historical entity submitted"));
}

#[test]
fn several_visible_ranges_fail() {
    let dir = TempDir::new().unwrap();
    let path = write_scenario(
        &dir,
        r#"{"steps": [{"action": "visibleTimeRange", "ranges": [{"start": 0, "end": 1}, {"start": 2, "end": 3}]}]}"#,
    );

    hazard_console()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("visibleTimeRange"));
}
