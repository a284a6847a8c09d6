//! `package.json` conflict resolution over parsed JSON trees.
//!
//! Conflicting versions come either from the git index (stages 2 and 3) or
//! from a conflict-marked working copy. Both sides are parsed, deep-merged
//! with an ours/theirs strategy, and written back as 2-space pretty JSON.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::conflict::{self, has_conflict_markers};
use crate::core::error::{DriverError, DriverResult, action_required, status_label};
use crate::core::git::{Git, IndexStage, repo_relative};

pub const PACKAGE_JSON: &str = "package.json";

/// Which side wins keys defined differently on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Ours,
    Theirs,
}

impl ConflictStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictStrategy::Ours => "ours",
            ConflictStrategy::Theirs => "theirs",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ours" => Ok(ConflictStrategy::Ours),
            "theirs" => Ok(ConflictStrategy::Theirs),
            _ => Err(DriverError::InvalidStrategy(s.to_string())),
        }
    }
}

/// Where conflicting package.json content was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictSource {
    /// Unmerged index entries; the result must be staged afterwards
    Index { ours: String, theirs: String },
    /// Working file with conflict markers
    WorkingCopy { text: String },
}

impl ConflictSource {
    /// Conflict-marked text for both sources
    pub fn conflict_text(&self) -> String {
        match self {
            ConflictSource::Index { ours, theirs } => conflict::synthesize(ours, theirs),
            ConflictSource::WorkingCopy { text } => text.clone(),
        }
    }

    pub fn needs_staging(&self) -> bool {
        matches!(self, ConflictSource::Index { .. })
    }
}

/// Recursively merge two JSON values.
///
/// Objects present on both sides merge key by key; any other value defined on
/// both sides is taken from the winning side. Keys present on one side only
/// are always kept. Winning-side keys come first, in that side's order.
pub fn deep_merge(ours: &Value, theirs: &Value, strategy: ConflictStrategy) -> Value {
    match (ours, theirs) {
        (Value::Object(ours), Value::Object(theirs)) => {
            Value::Object(merge_objects(ours, theirs, strategy))
        }
        _ => match strategy {
            ConflictStrategy::Ours => ours.clone(),
            ConflictStrategy::Theirs => theirs.clone(),
        },
    }
}

fn merge_objects(
    ours: &Map<String, Value>,
    theirs: &Map<String, Value>,
    strategy: ConflictStrategy,
) -> Map<String, Value> {
    let (winner, loser) = match strategy {
        ConflictStrategy::Ours => (ours, theirs),
        ConflictStrategy::Theirs => (theirs, ours),
    };

    let mut merged = Map::with_capacity(winner.len() + loser.len());
    for (key, value) in winner {
        let value = match loser.get(key) {
            Some(other) => match strategy {
                ConflictStrategy::Ours => deep_merge(value, other, strategy),
                ConflictStrategy::Theirs => deep_merge(other, value, strategy),
            },
            None => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    for (key, value) in loser {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Split a conflict-marked JSON document, parse both sides, merge them
pub fn resolve_conflict_text(text: &str, strategy: ConflictStrategy) -> DriverResult<Value> {
    let sides = conflict::split_sides(text)?;
    debug!(hunks = sides.hunks, "split conflict-marked package.json");
    let ours = parse_side(&sides.ours, "ours")?;
    let theirs = parse_side(&sides.theirs, "theirs")?;
    Ok(deep_merge(&ours, &theirs, strategy))
}

fn parse_side(text: &str, side: &str) -> DriverResult<Value> {
    serde_json::from_str(text)
        .map_err(|e| DriverError::MalformedConflict(format!("{side} side is not valid JSON: {e}")))
}

/// Pretty JSON, 2-space indent, trailing newline
pub fn render(value: &Value) -> String {
    // Serializing a Value cannot fail
    let mut out = serde_json::to_string_pretty(value).unwrap_or_default();
    out.push('\n');
    out
}

/// `package.json` next to the given lockfile
pub fn sibling_of(lockfile: &Path) -> PathBuf {
    lockfile
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(PACKAGE_JSON)
}

/// Resolves package.json conflicts for one lockfile merge
pub struct Resolver<'g, 'r> {
    git: &'g Git<'r>,
    repo_root: PathBuf,
    strategy: ConflictStrategy,
    /// Regenerate command shown in remediation lines
    merge_command: String,
}

impl<'g, 'r> Resolver<'g, 'r> {
    pub fn new(
        git: &'g Git<'r>,
        repo_root: impl Into<PathBuf>,
        strategy: ConflictStrategy,
        merge_command: impl Into<String>,
    ) -> Self {
        Self {
            git,
            repo_root: repo_root.into(),
            strategy,
            merge_command: merge_command.into(),
        }
    }

    /// Find conflicting content, index first, then the working copy.
    pub fn acquire(&self, package_json: &Path) -> DriverResult<Option<ConflictSource>> {
        let rel = repo_relative(&self.repo_root, package_json);

        if self.git.has_unmerged_entries(&rel)? {
            info!("package.json has unmerged entries in git index");
            let ours = self.git.show_stage(IndexStage::Ours, &rel)?;
            let theirs = self.git.show_stage(IndexStage::Theirs, &rel)?;
            return Ok(match (ours, theirs) {
                (Some(ours), Some(theirs)) => Some(ConflictSource::Index { ours, theirs }),
                _ => {
                    warn!("failed to retrieve package.json versions from git index");
                    None
                }
            });
        }

        if !package_json.exists() {
            info!(path = %package_json.display(), "package.json does not exist");
            return Ok(None);
        }

        let text = fs::read_to_string(package_json)
            .map_err(|e| DriverError::io("read", package_json, e))?;
        if has_conflict_markers(&text) {
            info!("package.json in working directory has conflict markers");
            Ok(Some(ConflictSource::WorkingCopy { text }))
        } else {
            Ok(None)
        }
    }

    /// Resolve the package.json beside `lockfile`, if it is conflicted.
    ///
    /// Returns `true` when a resolution was written.
    pub fn resolve_for_lockfile(&self, lockfile: &Path) -> DriverResult<bool> {
        let package_json = sibling_of(lockfile);
        let Some(source) = self.acquire(&package_json)? else {
            return Ok(false);
        };

        info!(
            strategy = %self.strategy,
            "package.json has conflicts, attempting automatic resolution"
        );

        let resolved = resolve_conflict_text(&source.conflict_text(), self.strategy).map_err(
            |e| DriverError::PackageJsonUnresolvable {
                reason: e.to_string(),
                remediation: action_required(
                    "Manually resolve package.json conflicts",
                    &self.merge_command,
                ),
            },
        )?;

        fs::write(&package_json, render(&resolved))
            .map_err(|e| DriverError::io("write", &package_json, e))?;

        if source.needs_staging() {
            let rel = repo_relative(&self.repo_root, &package_json);
            self.git
                .stage(&rel)
                .map_err(|err| stage_failed(&package_json, err, &self.merge_command))?;
        }

        info!(strategy = %self.strategy, "package.json conflicts resolved");
        Ok(true)
    }
}

/// Staging error that keeps git's captured output
fn stage_failed(path: &Path, err: DriverError, merge_command: &str) -> DriverError {
    let remediation = action_required("Manually stage package.json", merge_command);
    match err {
        DriverError::CommandFailed {
            command,
            status,
            stdout,
            stderr,
        } => DriverError::StageFailed {
            path: path.to_path_buf(),
            reason: format!("`{command}` exited with {}", status_label(status)),
            stdout,
            stderr,
            remediation,
        },
        other => DriverError::StageFailed {
            path: path.to_path_buf(),
            reason: other.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            remediation,
        },
    }
}

/// Fail if the package.json beside `lockfile` still carries markers
pub fn ensure_resolved(lockfile: &Path, merge_command: &str) -> DriverResult<()> {
    let package_json = sibling_of(lockfile);
    if !package_json.exists() {
        return Ok(());
    }

    let text = fs::read(&package_json).map_err(|e| DriverError::io("read", &package_json, e))?;
    if has_conflict_markers(&text) {
        return Err(DriverError::PackageJsonConflicted {
            path: package_json,
            remediation: action_required("Resolve package.json conflicts", merge_command),
        });
    }
    Ok(())
}
