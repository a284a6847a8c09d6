//! Error taxonomy for the merge driver.
//!
//! Every variant is fatal for the current invocation and maps to exit code 1.
//! Variants that carry a remediation expose it as the diagnostic `help`, which
//! the binary prints as an `ACTION REQUIRED` line.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum DriverError {
    /// Lockfile basename matches no registry pattern
    #[error("unrecognized lockfile: {}", path.display())]
    #[diagnostic(code(lockmerge::unrecognized_lockfile))]
    UnrecognizedLockfile { path: PathBuf },

    /// Binary missing or not executable
    #[error("failed to spawn `{command}`: {source}")]
    #[diagnostic(code(lockmerge::spawn))]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit from a collaborator whose success is required
    #[error("`{command}` exited with {}", status_label(*status))]
    #[diagnostic(code(lockmerge::command_failed))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Package manager could not regenerate the lockfile
    #[error("failed to merge {}: `{command}` {reason}", file.display())]
    #[diagnostic(code(lockmerge::regenerate_failed))]
    RegenerateFailed {
        file: PathBuf,
        command: String,
        reason: String,
        stdout: String,
        stderr: String,
        #[help]
        remediation: String,
    },

    /// package.json still carries conflict markers before regeneration
    #[error("package.json still has unresolved conflicts: {}", path.display())]
    #[diagnostic(code(lockmerge::package_json_conflicted))]
    PackageJsonConflicted {
        path: PathBuf,
        #[help]
        remediation: String,
    },

    /// Conflict-marked package.json could not be resolved automatically
    #[error("failed to auto-resolve package.json conflicts: {reason}")]
    #[diagnostic(code(lockmerge::package_json_unresolvable))]
    PackageJsonUnresolvable {
        reason: String,
        #[help]
        remediation: String,
    },

    /// package.json driver invoked without a configured strategy
    #[error("package.json merge driver called but {key} is not configured")]
    #[diagnostic(
        code(lockmerge::strategy_missing),
        help("run `lockmerge install --resolve-package-json ours|theirs`")
    )]
    StrategyMissing { key: String },

    #[error("invalid resolution strategy `{0}` (expected `ours` or `theirs`)")]
    #[diagnostic(code(lockmerge::invalid_strategy))]
    InvalidStrategy(String),

    /// Text with markers that do not form well-nested hunks
    #[error("malformed conflict markers: {0}")]
    #[diagnostic(code(lockmerge::malformed_conflict))]
    MalformedConflict(String),

    /// Resolved file could not be staged
    #[error("failed to stage {}: {reason}", path.display())]
    #[diagnostic(code(lockmerge::stage_failed))]
    StageFailed {
        path: PathBuf,
        reason: String,
        stdout: String,
        stderr: String,
        #[help]
        remediation: String,
    },

    /// No work tree, or git itself is unavailable
    #[error("Current working directory is not using git or git is not installed")]
    #[diagnostic(code(lockmerge::not_a_repository))]
    NotARepository { path: PathBuf },

    #[error("failed to {action} {}: {source}", path.display())]
    #[diagnostic(code(lockmerge::io))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DriverError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Captured output of the failing collaborator, if any
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            Self::CommandFailed { stdout, stderr, .. }
            | Self::RegenerateFailed { stdout, stderr, .. }
            | Self::StageFailed { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

pub(crate) fn status_label(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// `ACTION REQUIRED` directive naming the command to re-run by hand
pub fn action_required(message: &str, command: &str) -> String {
    format!("{message}, then run: {command}")
}
