//! Integration tests for `lockmerge detect`

use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

mod util;
use util::lockmerge;

#[test]
fn json_lists_managers_in_pattern_order() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("yarn.lock")
        .write_str("# yarn lockfile v1\n\n")
        .unwrap();
    dir.child("pnpm-lock.yaml")
        .write_str("lockfileVersion: '9.0'\n")
        .unwrap();

    let out = lockmerge(dir.path())
        .args(["detect", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let parsed: Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["pnpm", "yarn-classic"]);
    assert_eq!(parsed[1]["command"], "yarn install --frozen-lockfile");
    assert_eq!(parsed[1]["text_merge"], true);
}

#[test]
fn table_output_names_lockfile() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("deno.lock").write_str("{}").unwrap();

    lockmerge(dir.path())
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("deno.lock"))
        .stdout(predicate::str::contains("Regenerate with"));
}

#[test]
fn empty_directory_reports_nothing() {
    let dir = assert_fs::TempDir::new().unwrap();

    lockmerge(dir.path())
        .args(["detect", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));

    lockmerge(dir.path())
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("No lockfiles found"));
}
