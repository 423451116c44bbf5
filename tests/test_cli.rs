mod fixtures;

use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::process::{Command, Stdio};
use tempfile::tempdir;

#[test]
fn it_dumps_a_saved_document_as_json() {
    let sample = model_data_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.arg(sample.to_str().unwrap());

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["images"][0]["name"], "/usr/bin/hello");
    assert_eq!(json["images"][0]["count"], 12);
}

#[test]
fn it_supports_stdin_input_with_dash() {
    let sample = sessions_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.args(["--no-indent", "-"])
        .stdin(Stdio::from(File::open(sample).unwrap()));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""name":"run-2009-06-02""#));
}

#[test]
fn it_respects_output_file() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("info.json");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.args(["-o", &f.to_string_lossy(), info_sample().to_str().unwrap()]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert!(
        output.stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&f).unwrap()).unwrap();
    assert_eq!(json["num_counters"], 4);
}

#[test]
fn it_fails_on_unknown_root_tag() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.arg(unknown_root_sample().to_str().unwrap());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("daemon-status"));
}

#[test]
fn it_fails_on_truncated_document() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.arg(truncated_model_data_sample().to_str().unwrap());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn it_checks_the_expected_kind() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.args(["--expect", "sessions", info_sample().to_str().unwrap()]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected a `sessions` document"));
}

#[cfg(unix)]
#[test]
fn it_runs_the_producer() {
    let d = tempdir().unwrap();
    let script = d.as_ref().join("opxml.sh");
    fs::write(
        &script,
        format!(
            "[ \"$1\" = sessions ] && cat '{}'\n",
            sessions_sample().to_string_lossy()
        ),
    )
    .unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("opxml_dump"));
    cmd.args(["--program", "sh", "--run"])
        .arg(&script)
        .arg("sessions");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("LLC_MISSES"));
}
