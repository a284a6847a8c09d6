//! Shared test utilities for integration tests
//!
//! Provides git repository fixtures and a preconfigured `lockmerge`
//! command used across multiple test files.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use assert_fs::prelude::*;

/// Environment variables that would change install behaviour on CI hosts
const HOST_ENV: [&str; 7] = [
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "INIT_CWD",
    "LOCKMERGE_SKIP_INSTALL",
    "LOCKMERGE_IGNORE_CI",
];

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking with its stderr on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

/// Fresh repository with an identity and a `main` branch
pub fn init_repo() -> assert_fs::TempDir {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    git(tmp.path(), &["init", "-q"]);
    git(tmp.path(), &["config", "user.name", "Test"]);
    git(tmp.path(), &["config", "user.email", "t@example.com"]);
    git(tmp.path(), &["config", "commit.gpgsign", "false"]);
    git(tmp.path(), &["checkout", "-q", "-b", "main"]);

    tmp
}

/// Repository with a committed package.json and package-lock.json
pub fn init_npm_repo(package_json: &str) -> assert_fs::TempDir {
    let tmp = init_repo();

    tmp.child("package.json")
        .write_str(package_json)
        .expect("write package.json");
    tmp.child("package-lock.json")
        .write_str(package_json)
        .expect("write package-lock.json");

    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-q", "-m", "init"]);

    tmp
}

/// `lockmerge` binary running in `dir` with host CI settings cleared
pub fn lockmerge(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("lockmerge").expect("binary built");
    cmd.current_dir(dir).arg("--no-color");
    for var in HOST_ENV {
        cmd.env_remove(var);
    }
    cmd
}

pub fn attributes(repo: &Path) -> String {
    std::fs::read_to_string(repo.join(".git/info/attributes")).unwrap_or_default()
}
