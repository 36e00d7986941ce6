use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const MANIFEST: &str = r#"
[document]
title = "CLI report"
author = "Tests"

[[style]]
tag = "Heading1"
size = 18

[[block]]
kind = "heading"
level = 1
text = "Overview"
bookmark = "overview"

[[block]]
kind = "paragraph"
text = "Generated from a manifest."

[[block]]
kind = "ul"
items = ["one", "two"]

[[block]]
kind = "inner_link"
text = "Top"
destination = "overview"
"#;

#[test]
fn test_binary_builds_manifest() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("report.toml");
    fs::write(&manifest, MANIFEST).unwrap();
    let output = dir.path().join("out.pdf");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.current_dir(dir.path())
        .arg("-m")
        .arg(&manifest)
        .arg("-o")
        .arg(&output)
        .arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Successfully saved PDF"))
        .stdout(predicate::str::contains("Size:"));

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    let info = predictables_report::metadata::read_info(&bytes).unwrap();
    assert_eq!(info.get("Title").map(String::as_str), Some("CLI report"));
}

#[test]
fn test_binary_dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("report.toml");
    fs::write(&manifest, MANIFEST).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.current_dir(dir.path()).arg("-m").arg(&manifest).arg("--dry-run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dry-run complete: 5 blocks"));
    assert!(!dir.path().join("output.pdf").exists());
}

#[test]
fn test_binary_uses_manifest_output() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("report.toml");
    fs::write(
        &manifest,
        "[document]\noutput = \"named.pdf\"\n\n[[block]]\nkind = \"paragraph\"\ntext = \"Hi\"\n",
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.current_dir(dir.path()).arg("-m").arg(&manifest).arg("-q");
    cmd.assert().success().stdout(predicate::str::is_empty());
    assert!(dir.path().join("named.pdf").is_file());
}

#[test]
fn test_binary_reports_invalid_manifest() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("bad.toml");
    fs::write(&manifest, "[[block]]\nkind = \"heading\"\nlevel = 8\ntext = \"x\"\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.current_dir(dir.path()).arg("-m").arg(&manifest);
    cmd.assert().failure();
    assert!(!dir.path().join("output.pdf").exists());
}

#[test]
fn test_binary_prints_labels() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.arg("--labels").arg("upper-roman").arg("--count").arg("4");
    cmd.assert().success().stdout("I\nII\nIII\nIV\n");
}

#[test]
fn test_binary_rejects_unknown_label_style() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.arg("--labels").arg("greek");
    cmd.assert().failure();
}

#[test]
fn test_binary_prints_default_configuration() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.arg("--get-default-configuration");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("heading"))
        .stdout(predicate::str::contains("size"))
        .stdout(predicate::str::contains("[margin]"));
}

#[test]
fn test_binary_returns_failure_when_no_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.assert().failure();
}

#[test]
fn test_binary_rejects_missing_config() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("report.toml");
    fs::write(&manifest, MANIFEST).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("predictables-report");
    cmd.current_dir(dir.path())
        .arg("-m")
        .arg(&manifest)
        .arg("-c")
        .arg("nope.toml");
    cmd.assert().failure();
}
