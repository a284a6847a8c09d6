//! Lockfile merge pipeline run once per merge-driver invocation.
//!
//! resolve package manager → resolve/validate package.json → text merge →
//! drop conflicted lockfile → regenerate → copy result over `%A`.
//!
//! Any failure aborts the whole invocation; git re-runs it from scratch.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::core::conflict::has_conflict_markers;
use crate::core::error::{DriverError, DriverResult, action_required, status_label};
use crate::core::git::Git;
use crate::core::install::STRATEGY_KEY;
use crate::core::package_json::{self, ConflictStrategy, PACKAGE_JSON, Resolver};
use crate::core::registry::{self, PackageManager, Platform};
use crate::infra::process::{CommandRunner, CommandSpec};

/// One merge-driver call: git's `%A %O %B %P` plus the repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInvocation {
    /// `%A`, where git expects the final content
    pub current: PathBuf,
    /// `%O`
    pub ancestor: PathBuf,
    /// `%B`
    pub other: PathBuf,
    /// `%P`, the path being merged
    pub target: PathBuf,
    pub repo_root: PathBuf,
}

impl MergeInvocation {
    /// Resolve driver arguments. `%A %O %B` are relative to `cwd`, the
    /// directory git started us in; `%P` is relative to the repository root.
    pub fn resolve(
        runner: &dyn CommandRunner,
        cwd: &Path,
        current: &Path,
        ancestor: &Path,
        other: &Path,
        path: &Path,
    ) -> Self {
        let repo_root = Git::new(runner, cwd)
            .show_toplevel()
            .unwrap_or_else(|| cwd.to_path_buf());
        Self {
            current: cwd.join(current),
            ancestor: cwd.join(ancestor),
            other: cwd.join(other),
            target: repo_root.join(path),
            repo_root,
        }
    }
}

/// Result of the `git merge-file` stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMergeOutcome {
    /// Binary lockfile, nothing attempted
    Skipped,
    Clean,
    Conflicted,
}

/// What a successful invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub file: PathBuf,
    /// `None` for a direct package.json merge
    pub package_manager: Option<&'static str>,
    pub text_merge: TextMergeOutcome,
    pub package_json_resolved: bool,
}

pub struct MergeEngine<'r> {
    runner: &'r dyn CommandRunner,
    platform: Platform,
}

impl<'r> MergeEngine<'r> {
    pub fn new(runner: &'r dyn CommandRunner) -> Self {
        Self {
            runner,
            platform: Platform::current(),
        }
    }

    #[instrument(skip_all, fields(file = %invocation.target.display()))]
    pub fn run(&self, invocation: &MergeInvocation) -> DriverResult<MergeReport> {
        let git = Git::new(self.runner, &invocation.repo_root);
        let target = &invocation.target;

        if target.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_JSON) {
            return self.merge_package_json(&git, invocation);
        }

        let pm = registry::resolve(target).ok_or_else(|| DriverError::UnrecognizedLockfile {
            path: target.clone(),
        })?;
        let merge_command = pm.merge_command(self.platform);
        info!(
            package_manager = pm.name,
            "attempting to merge {} via {merge_command}",
            target.display()
        );

        let package_json_resolved = match lockfile_strategy(&git)? {
            Some(strategy) => {
                info!(%strategy, "package.json conflict resolution is enabled");
                Resolver::new(&git, &invocation.repo_root, strategy, &merge_command)
                    .resolve_for_lockfile(target)?
            }
            None => false,
        };
        package_json::ensure_resolved(target, &merge_command)?;

        let text_merge = self.attempt_text_merge(&git, invocation, pm)?;
        remove_conflicted_lockfile(target, text_merge);
        self.regenerate(pm, target)?;
        finalize(&invocation.current, target)?;

        Ok(MergeReport {
            file: target.clone(),
            package_manager: Some(pm.name),
            text_merge,
            package_json_resolved,
        })
    }

    /// `git merge-file`, output written to the target whatever the status
    fn attempt_text_merge(
        &self,
        git: &Git<'_>,
        invocation: &MergeInvocation,
        pm: &PackageManager,
    ) -> DriverResult<TextMergeOutcome> {
        let target = &invocation.target;
        if !pm.supports_text_merge(target) {
            info!("{} is binary format, skipping text-based merge", target.display());
            return Ok(TextMergeOutcome::Skipped);
        }

        info!("attempting text-based merge for {}", target.display());
        let output = git.merge_file(&invocation.current, &invocation.ancestor, &invocation.other)?;
        info!("git merge-file exit {}", status_label(output.status));

        let markers = has_conflict_markers(&output.merged);
        let outcome = if output.clean() && !markers {
            TextMergeOutcome::Clean
        } else {
            if markers {
                info!("text-based merge output contains conflict markers");
            }
            info!("text-based merge had conflicts, relying on package manager to regenerate");
            TextMergeOutcome::Conflicted
        };

        fs::write(target, &output.merged).map_err(|e| DriverError::io("write", target, e))?;
        Ok(outcome)
    }

    /// Run the package manager in the lockfile's directory
    fn regenerate(&self, pm: &PackageManager, lockfile: &Path) -> DriverResult<()> {
        let cwd = lockfile.parent().unwrap_or_else(|| Path::new("."));
        let spec = CommandSpec::new(
            pm.executable(self.platform),
            pm.merge_args.iter().copied(),
            cwd,
        );
        info!("running {spec}");

        let remediation = action_required(
            "Resolve package.json conflicts",
            &pm.merge_command(self.platform),
        );
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| DriverError::RegenerateFailed {
                file: lockfile.to_path_buf(),
                command: spec.display_line(),
                reason: format!("could not be started: {e}"),
                stdout: String::new(),
                stderr: String::new(),
                remediation: remediation.clone(),
            })?;

        if !output.success() {
            return Err(DriverError::RegenerateFailed {
                file: lockfile.to_path_buf(),
                command: spec.display_line(),
                reason: format!("exited with {}", status_label(output.status)),
                stdout: output.stdout_lossy(),
                stderr: output.stderr_lossy(),
                remediation,
            });
        }
        Ok(())
    }

    /// `%P` is package.json itself: merge the texts and resolve markers
    fn merge_package_json(
        &self,
        git: &Git<'_>,
        invocation: &MergeInvocation,
    ) -> DriverResult<MergeReport> {
        info!("attempting to merge package.json");
        let strategy = configured_strategy(git)?.ok_or_else(|| DriverError::StrategyMissing {
            key: STRATEGY_KEY.to_string(),
        })?;
        info!(%strategy, "resolving package.json conflicts");

        let output = git.merge_file(&invocation.current, &invocation.ancestor, &invocation.other)?;
        info!("git merge-file exit {}", status_label(output.status));
        if output.merged.is_empty() {
            return Err(DriverError::CommandFailed {
                command: "git merge-file -p".to_string(),
                status: output.status,
                stdout: String::new(),
                stderr: "git merge-file produced no output".to_string(),
            });
        }

        let merged = String::from_utf8_lossy(&output.merged).into_owned();
        let (content, text_merge) = if has_conflict_markers(&merged) {
            let resolved = package_json::resolve_conflict_text(&merged, strategy).map_err(|e| {
                DriverError::PackageJsonUnresolvable {
                    reason: e.to_string(),
                    remediation: action_required(
                        "Manually resolve package.json conflicts",
                        &format!("git add {PACKAGE_JSON}"),
                    ),
                }
            })?;
            (package_json::render(&resolved), TextMergeOutcome::Conflicted)
        } else {
            (merged, TextMergeOutcome::Clean)
        };

        for path in [&invocation.current, &invocation.target] {
            fs::write(path, &content).map_err(|e| DriverError::io("write", path, e))?;
        }

        match text_merge {
            TextMergeOutcome::Conflicted => {
                info!(%strategy, "package.json conflicts resolved successfully")
            }
            _ => info!("package.json merged successfully (no conflicts)"),
        }

        Ok(MergeReport {
            file: invocation.target.clone(),
            package_manager: None,
            text_merge,
            package_json_resolved: text_merge == TextMergeOutcome::Conflicted,
        })
    }
}

/// Strategy stored in local git config, if any
pub fn configured_strategy(git: &Git<'_>) -> DriverResult<Option<ConflictStrategy>> {
    git.config_get(STRATEGY_KEY)?
        .map(|value| value.parse())
        .transpose()
}

/// Strategy for the lockfile flow. An unparsable value disables
/// package.json resolution instead of failing an unrelated lockfile merge.
fn lockfile_strategy(git: &Git<'_>) -> DriverResult<Option<ConflictStrategy>> {
    match configured_strategy(git) {
        Err(err @ DriverError::InvalidStrategy(_)) => {
            warn!("{err}, package.json conflict resolution is disabled");
            Ok(None)
        }
        other => other,
    }
}

/// Delete a conflict-marked lockfile so the package manager starts clean.
/// Failure is only a warning: regeneration overwrites the file anyway.
fn remove_conflicted_lockfile(lockfile: &Path, outcome: TextMergeOutcome) {
    if outcome != TextMergeOutcome::Conflicted || !lockfile.exists() {
        return;
    }
    match fs::remove_file(lockfile) {
        Ok(()) => info!("removed conflicted lockfile to allow package manager to regenerate it"),
        Err(e) => warn!("failed to remove conflicted lockfile: {e}"),
    }
}

/// Copy the regenerated lockfile over `%A`
fn finalize(current: &Path, lockfile: &Path) -> DriverResult<()> {
    let bytes = fs::read(lockfile).map_err(|e| DriverError::io("read", lockfile, e))?;
    fs::write(current, bytes).map_err(|e| DriverError::io("write", current, e))?;
    info!("{} merged successfully", lockfile.display());
    Ok(())
}
