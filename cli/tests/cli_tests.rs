//! CLI binary integration tests using assert_cmd + predicates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("formstate").expect("binary should exist")
}

fn simple_schema() -> String {
    serde_json::json!({
        "types": [{
            "name": "book",
            "jsonType": "object",
            "fields": [
                {"name": "title", "type": "string"},
                {"name": "secret", "type": "string", "hidden": true},
                {"name": "isbn", "type": "string", "readOnly": true}
            ]
        }]
    })
    .to_string()
}

fn write_inputs(dir: &TempDir, document: serde_json::Value) -> (String, String) {
    let schema = dir.path().join("schema.json");
    let doc = dir.path().join("doc.json");
    fs::write(&schema, simple_schema()).unwrap();
    fs::write(&doc, document.to_string()).unwrap();
    (
        schema.to_str().unwrap().to_string(),
        doc.to_str().unwrap().to_string(),
    )
}

// ── Prepare ─────────────────────────────────────────────────────────────────

#[test]
fn test_prepare_to_stdout() {
    let dir = TempDir::new().unwrap();
    let (schema, doc) = write_inputs(&dir, serde_json::json!({"title": "Dune", "isbn": "1"}));

    let output = cmd()
        .args(["prepare", "--schema", &schema, "--document", &doc])
        .args(["--format", "compact"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let tree: serde_json::Value = serde_json::from_slice(&output).expect("stdout should be JSON");
    let keys: Vec<&str> = tree["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["field-title", "field-isbn"]);
    assert_eq!(tree["members"][1]["field"]["readOnly"], true);
    assert_eq!(tree["members"][0]["field"]["readOnly"], false);
}

#[test]
fn test_prepare_to_file() {
    let dir = TempDir::new().unwrap();
    let (schema, doc) = write_inputs(&dir, serde_json::json!({"title": "Dune"}));
    let output = dir.path().join("tree.json");

    cmd()
        .args(["prepare", "--schema", &schema, "--document", &doc])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = fs::read_to_string(&output).expect("output file should exist");
    let tree: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(tree["schemaType"]["name"], "book");
}

#[test]
fn test_prepare_non_object_document_fails() {
    let dir = TempDir::new().unwrap();
    let (schema, doc) = write_inputs(&dir, serde_json::json!(["not", "an", "object"]));

    cmd()
        .args(["prepare", "--schema", &schema, "--document", &doc])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Building form state failed"));
}

#[test]
fn test_prepare_unknown_root_type() {
    let dir = TempDir::new().unwrap();
    let (schema, doc) = write_inputs(&dir, serde_json::json!({}));

    cmd()
        .args(["prepare", "--schema", &schema, "--document", &doc])
        .args(["--type", "magazine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown root type: magazine"));
}

#[test]
fn test_prepare_invalid_focus_path() {
    let dir = TempDir::new().unwrap();
    let (schema, doc) = write_inputs(&dir, serde_json::json!({}));

    cmd()
        .args(["prepare", "--schema", &schema, "--document", &doc])
        .args(["--focus", "title[oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid path argument"));
}

// ── Reconcile ───────────────────────────────────────────────────────────────

#[test]
fn test_reconcile_identical_documents_reuses_root() {
    let dir = TempDir::new().unwrap();
    let previous = dir.path().join("previous.json");
    let next = dir.path().join("next.json");
    let doc = serde_json::json!({"a": {"b": [1, 2]}, "c": "x"}).to_string();
    fs::write(&previous, &doc).unwrap();
    fs::write(&next, &doc).unwrap();

    let output = cmd()
        .args(["reconcile", previous.to_str().unwrap(), next.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["reused"], serde_json::json!([""]));
    assert_eq!(report["value"]["a"]["b"], serde_json::json!([1, 2]));
}

// ── Error Cases ─────────────────────────────────────────────────────────────

#[test]
fn test_missing_input_file() {
    cmd()
        .args(["prepare", "--schema", "/nonexistent/schema.json"])
        .args(["--document", "/nonexistent/doc.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open schema descriptor file"));
}

#[test]
fn test_invalid_json_input() {
    let dir = TempDir::new().unwrap();
    let schema = dir.path().join("bad.json");
    fs::write(&schema, "not valid json {{{").unwrap();

    cmd()
        .args(["prepare", "--schema", schema.to_str().unwrap()])
        .args(["--document", schema.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse schema descriptor"));
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("form-state"));
}
