use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

const PURCHASE: &str = "https://region1.google-analytics.com/g/collect?v=2&tid=G-TEST&cid=1.2\
&dl=https%3A%2F%2Fshop.example%2Fthanks&en=purchase&currency=EUR&value=10";

fn hitaudit(config_dir: &tempfile::TempDir) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("hitaudit");
    let mut cmd = Command::new(bin);
    // never pick up the developer's own config file
    cmd.arg("--config")
        .arg(config_dir.path().join("absent.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("stdout is a single json document")
}

#[test]
fn decode_reports_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let assert = hitaudit(&dir)
        .args(["decode", PURCHASE])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    assert_eq!(report["event_name"].as_str(), Some("purchase"));
    assert_eq!(report["tracked"].as_bool(), Some(true));
    assert_eq!(report["user_properties"]["client_id"].as_str(), Some("1.2"));

    let errors: Vec<&str> = report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        errors,
        vec![
            "Event parameters missing: \n - transaction_id",
            "Event purchase requires items.",
        ]
    );
}

#[test]
fn decode_respects_tracked_override() {
    let dir = tempfile::tempdir().unwrap();
    let assert = hitaudit(&dir)
        .args(["decode", PURCHASE, "--tracked", "page_view"])
        .assert()
        .success();
    let report = stdout_json(assert.get_output());

    assert_eq!(report["tracked"].as_bool(), Some(false));
    assert!(report["errors"].as_array().unwrap().is_empty());
}

#[test]
fn decode_rejects_truncated_item() {
    let dir = tempfile::tempdir().unwrap();
    hitaudit(&dir)
        .args([
            "decode",
            "https://www.google-analytics.com/g/collect?v=2&en=purchase&pr1=idA~k0color",
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn schema_prints_effective_registry() {
    let dir = tempfile::tempdir().unwrap();
    let assert = hitaudit(&dir).arg("schema").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("tracked_events"));
    assert!(stdout.contains("purchase"));
}
