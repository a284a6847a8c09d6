//! Integration tests for install / uninstall / status

use std::fs;

use assert_fs::prelude::*;
use predicates::prelude::*;

mod util;
use util::{attributes, git, git_available, init_repo, lockmerge};

const LOCKFILES: [&str; 7] = [
    "package-lock.json",
    "npm-shrinkwrap.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "bun.lock",
    "bun.lockb",
    "deno.lock",
];

#[test]
fn install_twice_registers_once() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();

    lockmerge(repo.path()).arg("install").assert().success();
    lockmerge(repo.path()).arg("install").assert().success();

    let attrs = attributes(repo.path());
    for lockfile in LOCKFILES {
        let line = format!("{lockfile} merge=lockmerge");
        assert_eq!(attrs.lines().filter(|l| *l == line).count(), 1, "{line}");
    }
    assert!(!attrs.contains("package.json merge="));

    let driver = git(repo.path(), &["config", "--local", "merge.lockmerge.driver"]);
    assert!(driver.trim_end().ends_with("merge %A %O %B %P"));

    lockmerge(repo.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("lockmerge: installed"));
}

#[test]
fn uninstall_removes_registration() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();

    lockmerge(repo.path()).arg("install").assert().success();
    lockmerge(repo.path()).arg("uninstall").assert().success();

    assert!(!attributes(repo.path()).contains("merge=lockmerge"));
    lockmerge(repo.path())
        .arg("status")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not installed"));
}

#[test]
fn install_recreates_missing_info_dir() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();
    let info = repo.path().join(".git/info");
    if info.exists() {
        fs::remove_dir_all(&info).unwrap();
    }

    lockmerge(repo.path()).arg("install").assert().success();
    assert!(attributes(repo.path()).contains("yarn.lock merge=lockmerge"));
}

#[test]
fn existing_attributes_survive_install_and_uninstall() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();
    repo.child(".git/info/attributes").write_str("foo").unwrap();

    lockmerge(repo.path()).arg("install").assert().success();
    let attrs = attributes(repo.path());
    assert!(attrs.starts_with("foo\n"));
    assert!(attrs.contains("package-lock.json merge=lockmerge"));

    lockmerge(repo.path()).arg("uninstall").assert().success();
    assert_eq!(attributes(repo.path()), "foo\n");
}

#[test]
fn strategy_adds_package_json_attribute() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();

    lockmerge(repo.path())
        .args(["install", "--resolve-package-json", "theirs"])
        .assert()
        .success();

    assert!(attributes(repo.path()).contains("package.json merge=lockmerge"));
    let strategy = git(
        repo.path(),
        &["config", "--local", "merge.lockmerge.resolvePackageJson"],
    );
    assert_eq!(strategy.trim(), "theirs");

    // reinstall without a strategy drops both
    lockmerge(repo.path()).arg("install").assert().success();
    assert!(!attributes(repo.path()).contains("package.json merge="));
}

#[test]
fn uninstall_removes_legacy_driver_lines() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();
    repo.child(".git/info/attributes")
        .write_str("*.png binary\npackage-lock.json merge=npm-merge-driver-install\n")
        .unwrap();
    git(
        repo.path(),
        &["config", "--local", "merge.npm-merge-driver-install.driver", "old %A"],
    );

    lockmerge(repo.path()).arg("uninstall").assert().success();

    assert_eq!(attributes(repo.path()), "*.png binary\n");
    let config = fs::read_to_string(repo.path().join(".git/config")).unwrap();
    assert!(!config.contains("npm-merge-driver-install"));
}

#[test]
fn skip_install_env_leaves_repo_untouched() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();

    lockmerge(repo.path())
        .env("LOCKMERGE_SKIP_INSTALL", "true")
        .arg("install")
        .assert()
        .success();
    assert!(!attributes(repo.path()).contains("merge=lockmerge"));
}

#[test]
fn ci_skips_unless_ignored() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();

    lockmerge(repo.path())
        .env("CI", "1")
        .arg("install")
        .assert()
        .success();
    assert!(!attributes(repo.path()).contains("merge=lockmerge"));

    lockmerge(repo.path())
        .env("CI", "1")
        .env("LOCKMERGE_IGNORE_CI", "true")
        .arg("install")
        .assert()
        .success();
    assert!(attributes(repo.path()).contains("merge=lockmerge"));
}

#[test]
fn install_outside_repository_fails() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let outer = assert_fs::TempDir::new().unwrap();
    let dir = outer.child("plain");
    dir.create_dir_all().unwrap();

    lockmerge(dir.path())
        .env("GIT_CEILING_DIRECTORIES", outer.path())
        .arg("install")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not using git"));

    // uninstall is a no-op there
    lockmerge(dir.path())
        .env("GIT_CEILING_DIRECTORIES", outer.path())
        .arg("uninstall")
        .assert()
        .success();
}

#[test]
fn init_cwd_selects_target_repository() {
    if !git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let repo = init_repo();
    let elsewhere = assert_fs::TempDir::new().unwrap();

    lockmerge(elsewhere.path())
        .env("INIT_CWD", repo.path())
        .env("GIT_CEILING_DIRECTORIES", elsewhere.path())
        .arg("install")
        .assert()
        .success();
    assert!(attributes(repo.path()).contains("merge=lockmerge"));
}
