//! CLI integration tests
//!
//! These tests run the `xmlconvert` binary and check its output.

#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn xmlconvert_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xmlconvert"))
}

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_str().unwrap().to_string()
}

#[test]
fn test_cli_converts_file() {
    let output = Command::new(xmlconvert_bin())
        .arg(fixture("person.xml"))
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "conversion should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json["age"], 30);
    assert_eq!(json["@attributes"]["id"], "7");
    assert!(stdout.contains("\n    \"name\""), "should be indented by four spaces");
}

#[test]
fn test_cli_reads_stdin_compact() {
    let mut child = Command::new(xmlconvert_bin())
        .args(["--compact", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"<note><to>User</to><n>010</n></note>")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"to":"User","n":"010"}"#
    );
}

#[test]
fn test_cli_namespaces_flag() {
    let output = Command::new(xmlconvert_bin())
        .args(["--namespaces", "--compact", fixture("feed.xml").as_str()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["h:title"], "Header");
    assert_eq!(json["f:table"]["@namespace"], "f");
}

#[test]
fn test_cli_xsd_validation_failure() {
    let output = Command::new(xmlconvert_bin())
        .args(["--xsd", fixture("person.xsd").as_str(), fixture("person_invalid.xml").as_str()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "invalid document should fail");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: XML failed XSD validation"), "stderr: {}", stderr);
}

#[test]
fn test_cli_dtd_validation() {
    let output = Command::new(xmlconvert_bin())
        .args(["--dtd", fixture("note.xml").as_str()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["from"], "Jani");
}

#[test]
fn test_cli_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.json");

    let output = Command::new(xmlconvert_bin())
        .args([fixture("note.xml").as_str(), "--output", target.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("\"body\": \"Don't forget me this weekend!\""));
}

#[test]
fn test_cli_malformed_input() {
    let mut child = Command::new(xmlconvert_bin())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child.stdin.take().unwrap().write_all(b"<a><b></a>").unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: Invalid XML"));
}

#[test]
fn test_cli_missing_file() {
    let output = Command::new(xmlconvert_bin())
        .arg(fixtures_dir().join("does-not-exist.xml"))
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
