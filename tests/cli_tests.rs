//! CLI integration tests
//!
//! These tests verify the CLI commands work correctly by running the binary.

#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

fn xsdbind(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xsdbind"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_cli_inspect_tree_schema() {
    let output = xsdbind(&["inspect", &fixture("person.xsd")]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect should succeed");
    assert!(stdout.contains("xsdbind v"), "should show version");
    assert!(stdout.contains("Dialect: tree"));
    assert!(stdout.contains("Person"));
    assert!(stdout.contains("age [0..1] : xs:int"));
}

#[test]
fn test_cli_inspect_json_output() {
    let output = xsdbind(&["inspect", "--json", &fixture("order.xsd")]);
    assert!(output.status.success(), "inspect --json should succeed");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("should be valid JSON");
    assert_eq!(json["dialect"], "divided");
    assert_eq!(json["root"], "Order");
    assert_eq!(json["targetNamespace"], "urn:example:orders");
    assert_eq!(json["definitions"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_cli_inspect_definition() {
    let output = xsdbind(&["inspect", "-e", "Line", &fixture("order.xsd")]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("quantity"));

    let missing = xsdbind(&["inspect", "-e", "Invoice", &fixture("order.xsd")]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("not found"));
}

#[test]
fn test_cli_unknown_dialect() {
    let output = xsdbind(&["--dialect", "nested", "inspect", &fixture("person.xsd")]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown schema dialect"));
}

// ============================================================================
// Validate / Decode / Encode Command Tests
// ============================================================================

#[test]
fn test_cli_validate() {
    let output = xsdbind(&["validate", "-s", &fixture("order.xsd"), &fixture("order.xml")]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "valid document should pass: {}", stdout);
    assert!(stdout.contains("is valid"));
}

#[test]
fn test_cli_validate_invalid_document() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "<Order currency=\"EUR\"><id>x</id></Order>").unwrap();
    file.flush().unwrap();

    let path = file.path().to_string_lossy().into_owned();
    let output = xsdbind(&["validate", "-s", &fixture("order.xsd"), &fixture("order.xml"), &path]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("is valid"));
    assert!(stdout.contains("is invalid"));
}

#[test]
fn test_cli_decode() {
    let output = xsdbind(&["decode", "-s", &fixture("order.xsd"), &fixture("order.xml")]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["currency"], "EUR");
    assert_eq!(json["placed"], "2024-03-01");
    assert_eq!(json["lines"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["lines"][1]["quantity"], 10);
}

#[test]
fn test_cli_encode() {
    let output = xsdbind(&["encode", "-s", &fixture("order.xsd"), &fixture("order.json")]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "encode should succeed");
    assert!(stdout.starts_with("<?xml"));
    assert!(stdout.contains("<Order xmlns=\"urn:example:orders\" currency=\"USD\">"));
    assert!(stdout.contains("<placed>2024-05-17</placed>"));
    assert!(stdout.contains("<sku>QRS-0042</sku>"));
}

#[test]
fn test_cli_encode_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("order.xml");
    let target_str = target.to_string_lossy().into_owned();

    let output = xsdbind(&["encode", "-s", &fixture("order.xsd"), &fixture("order.json"), "-o", &target_str]);
    assert!(output.status.success());

    let check = xsdbind(&["validate", "-s", &fixture("order.xsd"), &target_str]);
    assert!(check.status.success());
}
