//! Driver registration in local git config and `info/attributes`.
//!
//! Install always uninstalls first, so running it repeatedly leaves exactly
//! one registration. Attributes go to the common git dir so linked worktrees
//! share them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::core::error::{DriverError, DriverResult};
use crate::core::git::Git;
use crate::core::package_json::{ConflictStrategy, PACKAGE_JSON};
use crate::core::registry;
use crate::infra::config::Settings;
use crate::infra::process::CommandRunner;

pub const DRIVER_NAME: &str = "lockmerge";
pub const DRIVER_SECTION: &str = "merge.lockmerge";
pub const DRIVER_NAME_KEY: &str = "merge.lockmerge.name";
pub const DRIVER_COMMAND_KEY: &str = "merge.lockmerge.driver";
pub const STRATEGY_KEY: &str = "merge.lockmerge.resolvePackageJson";

const DRIVER_DESCRIPTION: &str = "automatically merge package manager lockfiles";

/// Config sections removed on uninstall, current driver plus earlier names
const DRIVER_SECTIONS: [&str; 3] = [
    DRIVER_SECTION,
    "merge.npm-merge-driver-install",
    "merge.npm-merge-driver",
];

/// Environment variables that indicate a CI run
const CI_VARS: [&str; 4] = ["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER", "RUN_ID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Command git runs, with `%A %O %B %P` placeholders
    pub driver_command: String,
    pub strategy: Option<ConflictStrategy>,
}

impl InstallOptions {
    /// Driver command invoking `exe merge %A %O %B %P`
    pub fn for_executable(exe: &Path, strategy: Option<ConflictStrategy>) -> Self {
        let exe = exe
            .to_string_lossy()
            .replace('\\', "/")
            .replace('\'', r"'\''");
        Self {
            driver_command: format!("'{exe}' merge %A %O %B %P"),
            strategy,
        }
    }
}

/// Reason an install request was skipped, if any
pub fn skip_reason(settings: &Settings) -> Option<&'static str> {
    if settings.skip_install {
        return Some("LOCKMERGE_SKIP_INSTALL is set, skipping install");
    }
    if ci_detected() && !settings.ignore_ci {
        return Some("CI detected, skipping install");
    }
    None
}

fn ci_detected() -> bool {
    CI_VARS.iter().any(|var| env::var_os(var).is_some())
}

/// Attribute line registering the driver for `pattern`
pub fn attribute_line(pattern: &str) -> String {
    format!("{pattern} merge={DRIVER_NAME}")
}

pub struct Installer<'r> {
    runner: &'r dyn CommandRunner,
    cwd: PathBuf,
}

impl<'r> Installer<'r> {
    pub fn new(runner: &'r dyn CommandRunner, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cwd: cwd.into(),
        }
    }

    /// Repository root and common git dir, or `NotARepository`
    fn locate(&self) -> DriverResult<(Git<'r>, PathBuf)> {
        let not_a_repo = || DriverError::NotARepository {
            path: self.cwd.clone(),
        };
        let root = Git::new(self.runner, &self.cwd)
            .show_toplevel()
            .ok_or_else(not_a_repo)?;
        let git = Git::new(self.runner, root);
        let common_dir = git.common_dir().ok_or_else(not_a_repo)?;
        Ok((git, common_dir))
    }

    pub fn install(&self, options: &InstallOptions) -> DriverResult<PathBuf> {
        let (git, common_dir) = self.locate()?;
        remove_registration(&git, &common_dir)?;

        let info_dir = common_dir.join("info");
        fs::create_dir_all(&info_dir).map_err(|e| DriverError::io("create", &info_dir, e))?;

        git.config_set(DRIVER_NAME_KEY, DRIVER_DESCRIPTION)?;
        git.config_set(DRIVER_COMMAND_KEY, &options.driver_command)?;
        if let Some(strategy) = options.strategy {
            git.config_set(STRATEGY_KEY, strategy.as_str())?;
        }

        let attr_file = info_dir.join("attributes");
        let mut contents = read_attributes(&attr_file)?;
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        for pattern in registry::all_lockfile_patterns() {
            contents.push_str(&attribute_line(pattern));
            contents.push('\n');
        }
        if options.strategy.is_some() {
            contents.push_str(&attribute_line(PACKAGE_JSON));
            contents.push('\n');
        }
        fs::write(&attr_file, contents).map_err(|e| DriverError::io("write", &attr_file, e))?;

        info!("installed successfully");
        Ok(git.dir().to_path_buf())
    }

    /// Remove every registration. Outside a repository this is a no-op.
    pub fn uninstall(&self) -> DriverResult<()> {
        match self.locate() {
            Ok((git, common_dir)) => remove_registration(&git, &common_dir)?,
            Err(_) => debug!("not inside a git repository, nothing to remove"),
        }
        info!("uninstalled successfully");
        Ok(())
    }

    /// Driver configured in git config or listed in the attributes file
    pub fn is_installed(&self) -> bool {
        let Ok((git, common_dir)) = self.locate() else {
            return false;
        };
        let in_config = matches!(git.config_get(DRIVER_COMMAND_KEY), Ok(Some(_)));
        let in_attributes = read_attributes(&common_dir.join("info").join("attributes"))
            .map(|text| text.lines().any(is_driver_line))
            .unwrap_or(false);
        in_config || in_attributes
    }
}

fn remove_registration(git: &Git<'_>, common_dir: &Path) -> DriverResult<()> {
    for section in DRIVER_SECTIONS {
        if git.config_remove_section(section)? {
            debug!(section, "removed git config section");
        }
    }

    let attr_file = common_dir.join("info").join("attributes");
    if !attr_file.exists() {
        return Ok(());
    }
    let contents = read_attributes(&attr_file)?;
    let kept: Vec<&str> = contents
        .lines()
        .filter(|line| !is_driver_line(line))
        .collect();
    let mut filtered = kept.join("\n");
    if !filtered.is_empty() {
        filtered.push('\n');
    }
    fs::write(&attr_file, filtered).map_err(|e| DriverError::io("write", &attr_file, e))
}

/// `<pattern> merge=<driver>` for the current or a legacy driver name
static DRIVER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S.*\smerge\s*=\s*(?:lockmerge|npm-merge-driver-install|npm-merge-driver)\s*$")
        .expect("driver line pattern is valid")
});

fn is_driver_line(line: &str) -> bool {
    DRIVER_LINE.is_match(line)
}

fn read_attributes(path: &Path) -> DriverResult<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path).map_err(|e| DriverError::io("read", path, e))
}
