//! Integration tests for the spdx-converter binary.
//!
//! These tests create SPDX files on the fly and run the full binary
//! against them to check argument handling, exit codes and output.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

// --- Helper Functions ---

/// Helper to get the binary command for testing.
fn get_cmd() -> Command {
    Command::cargo_bin("spdx-converter").unwrap()
}

/// A minimal, valid SPDX 2.3 JSON document
fn get_test_spdx() -> Value {
    json!({
        "spdxVersion": "SPDX-2.3",
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": "cli-test",
        "documentNamespace": "https://example.com/spdx/cli-test",
        "creationInfo": {
            "created": "2024-01-01T00:00:00Z",
            "creators": ["Tool: spdx-converter"]
        },
        "hasExtractedLicensingInfos": [{
            "licenseId": "LicenseRef-custom",
            "extractedText": "Custom terms",
            "crossRefs": [{ "url": "https://example.com/custom" }]
        }],
        "documentDescribes": ["SPDXRef-pkg"],
        "packages": [{
            "SPDXID": "SPDXRef-pkg",
            "name": "pkg",
            "downloadLocation": "NOASSERTION",
            "filesAnalyzed": false,
            "licenseConcluded": "LicenseRef-custom"
        }]
    })
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_test_spdx(dir: &TempDir, name: &str) -> PathBuf {
    write_file(dir, name, &serde_json::to_string_pretty(&get_test_spdx()).unwrap())
}

// --- Convert ---

#[test]
fn test_convert_json_to_tag() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.json");
    let output = dir.path().join("out.spdx");

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("SPDXVersion: SPDX-2.3"));
    assert!(text.contains("PackageName: pkg"));
    assert!(text.contains("Relationship: SPDXRef-DOCUMENT DESCRIBES SPDXRef-pkg"));
}

#[test]
fn test_convert_with_explicit_formats_and_exclusion() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.data");
    let output = dir.path().join("out.data");

    get_cmd()
        .args(["convert"])
        .arg(&input)
        .arg(&output)
        .args(["json", " Yaml ", "ExcludeLicenseDetails"])
        .assert()
        .success();

    let yaml: Value = serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(yaml["hasExtractedLicensingInfos"][0]["licenseId"], "LicenseRef-custom");
    assert!(yaml["hasExtractedLicensingInfos"][0].get("crossRefs").is_none());
}

#[test]
fn test_single_format_argument_is_ignored() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.json");
    let output = dir.path().join("out.rdf.ttl");

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .arg("XML")
        .assert()
        .success()
        .stderr(predicate::str::contains("will be ignored"));

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("@prefix spdx:"));
}

#[test]
fn test_extra_arguments_are_ignored() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.json");
    let output = dir.path().join("out.xml");

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .args(["JSON", "XML", "excludeLicenseDetails", "surplus"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Extra arguments will be ignored"));

    assert!(fs::read_to_string(&output).unwrap().contains("<Document>"));
}

#[test]
fn test_convert_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.json");
    let output = write_file(&dir, "out.yaml", "existing");

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("Caused by").not());

    assert_eq!(fs::read_to_string(&output).unwrap(), "existing");
}

#[test]
fn test_lenient_rdf_reader_is_opt_in() {
    let dir = tempdir().unwrap();
    let input = write_file(
        &dir,
        "in.rdf.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:spdx="http://spdx.org/rdf/terms#">
  <spdx:SpdxDocument rdf:about="https://example.com/spdx/rdf#SPDXRef-DOCUMENT">
    <spdx:name rdf:ID="n1">rdf</spdx:name>
  </spdx:SpdxDocument>
</rdf:RDF>
"#,
    );
    let output = dir.path().join("out.json");

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unsupported construct"));
    assert!(!output.exists());

    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .arg("--lenient-rdf")
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped unsupported RDF/XML construct"));
    assert!(output.exists());
}

#[test]
fn test_convert_missing_source() {
    let dir = tempdir().unwrap();
    get_cmd()
        .arg("convert")
        .arg(dir.path().join("missing.json"))
        .arg(dir.path().join("out.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_convert_invalid_format_token() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "in.json");
    get_cmd()
        .arg("convert")
        .arg(&input)
        .arg(dir.path().join("out.json"))
        .args(["JSON", "PDF"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("PDF is not a valid SPDX file type"));
}

#[test]
fn test_missing_arguments_exit_with_one() {
    get_cmd().arg("convert").arg("only-one.json").assert().failure().code(1);
    get_cmd().assert().failure().code(1);
}

// --- Verify ---

#[test]
fn test_verify_valid_document() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "doc.json");

    get_cmd()
        .arg("verify")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("This SPDX Document is valid."));
}

#[test]
fn test_verify_reports_every_problem() {
    let dir = tempdir().unwrap();
    let mut doc = get_test_spdx();
    doc.as_object_mut().unwrap().remove("name");
    doc["packages"][0]["licenseConcluded"] = json!("MIT AND");
    let input = write_file(&dir, "doc.json", &doc.to_string());

    get_cmd()
        .arg("verify")
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("This SPDX Document is not valid due to:"))
        .stdout(predicate::str::contains("\tSPDXRef-DOCUMENT: missing required field name"))
        .stdout(predicate::str::contains("invalid license expression in licenseConcluded"));
}

#[test]
fn test_verify_with_explicit_format() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "doc.txt");

    get_cmd()
        .args(["verify"])
        .arg(&input)
        .arg("json")
        .assert()
        .success();
}

#[test]
fn test_verify_json_report() {
    let dir = tempdir().unwrap();
    let input = write_file(
        &dir,
        "doc.spdx",
        "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT\n\
         DocumentNamespace: https://example.com/spdx/tag\nCreator: Tool: x\n\
         Created: 2024-01-01T00:00:00Z\nMysteryTag: 42\n",
    );

    let output = get_cmd()
        .arg("verify")
        .arg(&input)
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["issues"][0]["severity"], "warning");
    assert!(
        report["issues"][0]["message"]
            .as_str()
            .unwrap()
            .contains("unknown tag MysteryTag")
    );
    assert!(report["summary"]["errors"].as_u64().unwrap() >= 2);
}

#[test]
fn test_verify_missing_file() {
    let dir = tempdir().unwrap();
    get_cmd()
        .arg("verify")
        .arg(dir.path().join("nothing.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_verify_unknown_extension() {
    let dir = tempdir().unwrap();
    let input = write_test_spdx(&dir, "doc.unknownext");
    get_cmd()
        .arg("verify")
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid file name"));
}
