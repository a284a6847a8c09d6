//! Git collaborator surface used by the merge driver and installer.
//!
//! Thin wrappers over `git` subprocesses: local config, `merge-file`,
//! unmerged index inspection, staged blob retrieval and staging. Every call
//! runs in an explicit directory through a [`CommandRunner`].

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::core::error::{DriverError, DriverResult};
use crate::infra::process::{CommandOutput, CommandRunner, CommandSpec};

const GIT: &str = "git";

/// Index stages available during a conflicted merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStage {
    /// Stage 2, the current branch
    Ours,
    /// Stage 3, the branch being merged in
    Theirs,
}

impl IndexStage {
    fn prefix(self) -> &'static str {
        match self {
            IndexStage::Ours => ":2:",
            IndexStage::Theirs => ":3:",
        }
    }
}

/// Outcome of `git merge-file -p`
#[derive(Debug, Clone)]
pub struct MergeFileOutput {
    /// Merged text, possibly with conflict markers
    pub merged: Vec<u8>,
    pub status: Option<i32>,
}

impl MergeFileOutput {
    /// Non-zero exit means conflicts (or failure)
    pub fn clean(&self) -> bool {
        self.status == Some(0)
    }
}

/// Git invocations rooted at one directory
pub struct Git<'r> {
    runner: &'r dyn CommandRunner,
    dir: PathBuf,
}

impl<'r> Git<'r> {
    pub fn new(runner: &'r dyn CommandRunner, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run git; only a spawn failure is an error
    pub fn run<I, S>(&self, args: I) -> DriverResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(GIT, args, &self.dir);
        let output = self.runner.run(&spec).map_err(|source| DriverError::Spawn {
            command: spec.display_line(),
            source,
        })?;
        debug!(command = %spec, status = ?output.status, "git finished");
        Ok(output)
    }

    /// Run git and require a zero exit status
    pub fn run_checked<I, S>(&self, args: I) -> DriverResult<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let output = self.run(args.clone())?;
        if output.success() {
            return Ok(output);
        }
        Err(DriverError::CommandFailed {
            command: CommandSpec::new(GIT, args, &self.dir).display_line(),
            status: output.status,
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        })
    }

    /// `git rev-parse --show-toplevel`; `None` outside a work tree or
    /// when git is unavailable
    pub fn show_toplevel(&self) -> Option<PathBuf> {
        self.rev_parse_path("--show-toplevel")
    }

    /// `git rev-parse --git-common-dir`, absolute; shared by worktrees
    pub fn common_dir(&self) -> Option<PathBuf> {
        self.rev_parse_path("--git-common-dir")
    }

    fn rev_parse_path(&self, flag: &str) -> Option<PathBuf> {
        let output = self.run(["rev-parse", flag]).ok()?;
        if !output.success() {
            return None;
        }
        let raw = PathBuf::from(output.stdout_trimmed()?);
        let absolute = if raw.is_absolute() {
            raw
        } else {
            self.dir.join(raw)
        };
        Some(dunce::canonicalize(&absolute).unwrap_or(absolute))
    }

    /// `git config --local <key>`; `None` when unset or empty
    pub fn config_get(&self, key: &str) -> DriverResult<Option<String>> {
        let output = self.run(["config", "--local", key])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(output.stdout_trimmed())
    }

    /// `git config --local <key> <value>`
    pub fn config_set(&self, key: &str, value: &str) -> DriverResult<()> {
        self.run_checked(["config", "--local", key, value])?;
        Ok(())
    }

    /// Remove a local config section. Returns `false` if it did not exist.
    pub fn config_remove_section(&self, section: &str) -> DriverResult<bool> {
        let output = self.run(["config", "--local", "--remove-section", section])?;
        Ok(output.success())
    }

    /// Three-way text merge, result on stdout
    pub fn merge_file(
        &self,
        current: &Path,
        ancestor: &Path,
        other: &Path,
    ) -> DriverResult<MergeFileOutput> {
        let output = self.run([
            "merge-file".to_string(),
            "-p".to_string(),
            path_arg(current),
            path_arg(ancestor),
            path_arg(other),
        ])?;
        Ok(MergeFileOutput {
            merged: output.stdout,
            status: output.status,
        })
    }

    /// `git ls-files -u <path>` is non-empty
    pub fn has_unmerged_entries(&self, rel_path: &str) -> DriverResult<bool> {
        let output = self.run(["ls-files", "-u", "--", rel_path])?;
        Ok(output.success() && output.stdout_trimmed().is_some())
    }

    /// Blob content of `rel_path` at the given index stage
    pub fn show_stage(&self, stage: IndexStage, rel_path: &str) -> DriverResult<Option<String>> {
        let output = self.run(["show".to_string(), format!("{}{rel_path}", stage.prefix())])?;
        if !output.success() || output.stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(output.stdout_lossy()))
    }

    /// `git add <path>`
    pub fn stage(&self, rel_path: &str) -> DriverResult<()> {
        self.run_checked(["add", "--", rel_path])?;
        Ok(())
    }
}

/// Repository-relative path with forward slashes, as git pathspecs expect.
///
/// Falls back to the path as given when it is not under `root`.
pub fn repo_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
