// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the trackyard CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A two-row tracker table with every required column populated
fn write_table(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("trackers.json");
    let table = r#"[
        {
            "Tracker Name Id": "a0x000000000001",
            "Tracker Name": "Site Build",
            "Owner ID": "005000000000001",
            "ObjectName": "Site__c",
            "Fields": "Status__c,Build_Date__c,Region__c",
            "Filters": "[{\"field\":\"Status__c\",\"operator\":\"equals\",\"value\":\"Active\"},{\"field\":\"Build_Date__c\",\"operator\":\"greaterThan\",\"value\":\"2024-01-01\"}]",
            "Logic": "1 AND 2",
            "Query": "SELECT Status__c, Build_Date__c, Region__c FROM Site__c WHERE Status__c = 'Active' AND Build_Date__c > 2024-01-01",
            "Formatting": "[]",
            "OrderBy(Long)": "Status__c,Build_Date__c",
            "ResizeMap": "Status__c=120,Build_Date__c=90",
            "Label Map": "Status__c:Status,Build_Date__c:Built"
        },
        {
            "Tracker Name Id": "a0x000000000002",
            "Tracker Name": "Region Review",
            "Owner ID": "005000000000002",
            "ObjectName": "Site__c",
            "Fields": "Region__c,Owner_Name__c",
            "Filters": "[]",
            "Logic": "",
            "Query": "SELECT Region__c, Owner_Name__c FROM Site__c",
            "Formatting": "[]",
            "OrderBy(Long)": "Region__c",
            "ResizeMap": "Region__c=80",
            "Label Map": "Region__c:Region"
        }
    ]"#;
    fs::write(&path, table).expect("write table fixture");
    path
}

fn trackyard(output_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trackyard").expect("binary builds");
    cmd.env("TRACKYARD_OUTPUT_DIR", output_dir);
    cmd
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(prefix))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn audit_lists_matching_tracker_ids() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["audit"])
        .arg(&table)
        .args(["--fields", "Build_Date__c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a0x000000000001"))
        .stdout(predicate::str::contains("a0x000000000002").not());
}

#[test]
fn audit_detailed_writes_a_report_file() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["audit"])
        .arg(&table)
        .args(["--fields", "Region__c", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("audit_report_"));

    assert_eq!(files_with_prefix(&out, "audit_report_").len(), 1);
}

#[test]
fn plan_reports_affected_rows_and_columns() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["plan"])
        .arg(&table)
        .args(["--remove", "Build_Date__c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a0x000000000001"))
        .stdout(predicate::str::contains("Filters"))
        .stdout(predicate::str::contains("Logic"));

    assert_eq!(files_with_prefix(&out, "plan_").len(), 1);
}

#[test]
fn modify_removes_the_field_and_writes_artifact_pair() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["modify"])
        .arg(&table)
        .args(["--rows", "a0x000000000001", "--remove", "Build_Date__c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Modified"));

    let modified = files_with_prefix(&out, "modified_");
    let backup = files_with_prefix(&out, "backup_");
    assert_eq!(modified.len(), 1);
    assert_eq!(backup.len(), 1);

    let modified_text = fs::read_to_string(&modified[0]).unwrap();
    assert!(!modified_text.contains("Build_Date__c"));
    let backup_text = fs::read_to_string(&backup[0]).unwrap();
    assert!(backup_text.contains("Build_Date__c"));
}

#[test]
fn modify_without_operations_fails() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["modify"])
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to do"));
}

#[test]
fn check_json_reports_malformed_cells() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    // Clean table first.
    trackyard(&out)
        .args(["check-json"])
        .arg(&table)
        .assert()
        .success()
        .stdout(predicate::str::contains("No malformed JSON"));

    // Break one Filters cell.
    let broken = fs::read_to_string(&table)
        .unwrap()
        .replace("\"Filters\": \"[]\"", "\"Filters\": \"[{oops\"");
    fs::write(&table, broken).unwrap();

    trackyard(&out)
        .args(["check-json"])
        .arg(&table)
        .assert()
        .success()
        .stderr(predicate::str::contains("malformed JSON"))
        .stdout(predicate::str::contains("a0x000000000002"));

    assert_eq!(files_with_prefix(&out, "malformed_json_details_").len(), 1);
}

#[test]
fn restore_lists_states_and_replays_old_values() {
    let dir = TempDir::new().unwrap();
    let table = write_table(&dir);
    let out = dir.path().join("out");

    let history_path = dir.path().join("history.json");
    let history = r#"[
        {
            "Tracker": "Site Build",
            "id Tracker": "a0x000000000001",
            "Field": "Fields",
            "Modify Date": "02/01/2024 09:00:00",
            "Old Value": "Status__c,Build_Date__c",
            "New Value": "Status__c,Build_Date__c,Region__c",
            "Modified By": "alex"
        }
    ]"#;
    fs::write(&history_path, history).unwrap();

    trackyard(&out)
        .args(["restore"])
        .arg(&table)
        .arg("--history")
        .arg(&history_path)
        .args(["--tracker", "Site Build", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fields"));

    trackyard(&out)
        .args(["restore"])
        .arg(&table)
        .arg("--history")
        .arg(&history_path)
        .args(["--tracker", "Site Build", "--to", "01/01/2024 00:00:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 change(s) replayed"));

    let rows = files_with_prefix(&out, "restore_Site Build_");
    assert!(rows.iter().any(|p| p
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_restored_row.json"))));
}

#[test]
fn load_failure_reports_every_missing_column() {
    let dir = TempDir::new().unwrap();
    let table = dir.path().join("broken.json");
    fs::write(&table, r#"[{"Tracker Name Id": "t1"}]"#).unwrap();
    let out = dir.path().join("out");

    trackyard(&out)
        .args(["audit"])
        .arg(&table)
        .args(["--fields", "A__c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required columns"))
        .stderr(predicate::str::contains("Fields"));
}

#[test]
fn completions_emit_a_script() {
    let dir = TempDir::new().unwrap();
    trackyard(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trackyard"));
}
