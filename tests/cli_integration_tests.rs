//! CLI Integration Tests
//!
//! Runs the sheetprune binary against .xlsx fixtures written into a temp dir.
//!
//! # Coverage Exclusion
//! These tests are skipped during coverage runs.

#![cfg(not(coverage))]
#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use common::{addr, hidden_reference_workbook};
use predicates::prelude::*;
use sheetprune::excel::XlsxImporter;
use sheetprune::types::NamedRange;
use sheetprune::workbook::Workbook;
use std::path::PathBuf;
use tempfile::TempDir;

fn sheetprune() -> Command {
    Command::cargo_bin("sheetprune").unwrap()
}

/// Data, Calc (B2 = Hidden1!A1*2), hidden Hidden1, plus two named ranges
fn fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("model.xlsx");
    let mut wb = hidden_reference_workbook();
    wb.add_named_range(NamedRange::new("Revenue", "=Data!$A$1"))
        .add_named_range(NamedRange::new("Seed", "=Hidden1!$A$1"));
    wb.set_storage(&path);
    wb.save().unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    sheetprune()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sheetprune"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    sheetprune()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sheetprune"));
}

#[test]
fn test_delete_sheet_help() {
    sheetprune()
        .args(["delete-sheet", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SAFE MODE"));
}

#[test]
fn test_scan_requires_sheets() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    sheetprune().arg("scan").arg(&path).assert().failure();
}

// ═══════════════════════════════════════════════════════════════════════════
// READ-ONLY COMMANDS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_info_lists_sheets_and_names() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    sheetprune()
        .arg("info")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hidden1"))
        .stdout(predicate::str::contains("hidden"))
        .stdout(predicate::str::contains("Revenue"));
}

#[test]
fn test_info_json() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let output = sheetprune().args(["info", "--json"]).arg(&path).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sheets"].as_array().unwrap().len(), 3);
    assert_eq!(json["sheets"][2]["visibility"], "hidden");
}

#[test]
fn test_scan_reports_sites_and_keeps_file() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    let before = std::fs::read(&path).unwrap();

    sheetprune()
        .arg("scan")
        .arg(&path)
        .arg("Hidden1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Calc!B2"));

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_scan_json_live_only() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let output = sheetprune()
        .args(["scan", "--no-offline", "--json"])
        .arg(&path)
        .arg("Hidden1")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["strategy"], "live");
    assert_eq!(json["sites"][0]["address"], "B2");
}

// ═══════════════════════════════════════════════════════════════════════════
// MUTATING COMMANDS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_delete_hidden_to_output() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    let out = dir.path().join("clean.xlsx");

    sheetprune()
        .arg("delete-hidden")
        .arg(&path)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted: Hidden1"));

    let cleaned = XlsxImporter::new(&out).import().unwrap();
    assert!(!cleaned.has_sheet("Hidden1"));
    assert!(!cleaned.has_formula("Calc", addr("B2")).unwrap());
    assert!(XlsxImporter::new(&path).import().unwrap().has_sheet("Hidden1"));
}

#[test]
fn test_delete_sheet_unsafe_json() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    let output = sheetprune()
        .args(["delete-sheet", "--unsafe", "--json"])
        .arg(&path)
        .arg("Hidden1")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["report"]["safe"], false);
    assert_eq!(json["report"]["deleted"][0], "Hidden1");
    assert!(json["report"]["strategy"].is_null());

    let reloaded = XlsxImporter::new(&path).import().unwrap();
    assert!(!reloaded.has_sheet("Hidden1"));
    assert!(reloaded.has_formula("Calc", addr("B2")).unwrap());
}

#[test]
fn test_delete_missing_sheet_fails() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    sheetprune()
        .arg("delete-sheet")
        .arg(&path)
        .arg("Nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SheetNotFound"));
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    sheetprune()
        .arg("info")
        .arg(dir.path().join("absent.xlsx"))
        .assert()
        .failure();
}

#[test]
fn test_clean_names_broken_only_after_unsafe_delete() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    sheetprune()
        .args(["delete-sheet", "--unsafe"])
        .arg(&path)
        .arg("Hidden1")
        .assert()
        .success();

    sheetprune()
        .args(["clean-names", "--broken-only"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Seed"));

    let names: Vec<String> = XlsxImporter::new(&path)
        .import()
        .unwrap()
        .named_ranges()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(names, vec!["Revenue"]);
}

#[test]
fn test_break_links_without_links() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);

    sheetprune()
        .arg("break-links")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 broken, 0 failed"));
}

#[test]
fn test_config_file_beside_workbook() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    std::fs::write(dir.path().join(".sheetprune.yaml"), "safe: false\n").unwrap();

    let output = sheetprune()
        .args(["delete-hidden", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["report"]["safe"], false);
}

#[test]
fn test_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir);
    let config = dir.path().join("custom.yaml");
    std::fs::write(&config, "unknown_key: 1\n").unwrap();

    sheetprune()
        .arg("--config")
        .arg(&config)
        .arg("delete-hidden")
        .arg(&path)
        .assert()
        .failure();
}
