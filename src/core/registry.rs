//! Static table of supported package managers and their lockfiles.
//!
//! Patterns are disjoint across descriptors except `yarn.lock`, which both
//! yarn descriptors claim; lookups by filename alone resolve it to classic and
//! callers refine the choice with [`crate::core::yarn::detect`].

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::core::yarn::{self, YarnVariant};

/// Shared by the two yarn descriptors
pub const YARN_LOCKFILE: &str = "yarn.lock";

/// Target platform for executable name resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Whether `git merge-file` can be attempted on a lockfile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMerge {
    Always,
    /// Only when the basename equals this (text) variant
    OnlyFor(&'static str),
}

/// Immutable description of one package manager
#[derive(Debug, PartialEq, Eq)]
pub struct PackageManager {
    pub name: &'static str,
    pub lockfiles: &'static [&'static str],
    executable: &'static str,
    windows_suffix: &'static str,
    pub merge_args: &'static [&'static str],
    text_merge: TextMerge,
}

impl PackageManager {
    /// Executable name for the given platform
    pub fn executable(&self, platform: Platform) -> String {
        match platform {
            Platform::Unix => self.executable.to_string(),
            Platform::Windows => format!("{}{}", self.executable, self.windows_suffix),
        }
    }

    /// `true` when the lockfile at `path` is a text format
    pub fn supports_text_merge(&self, path: &Path) -> bool {
        match self.text_merge {
            TextMerge::Always => true,
            TextMerge::OnlyFor(name) => basename(path) == Some(name),
        }
    }

    /// Full regenerate command line, as shown in remediation messages
    pub fn merge_command(&self, platform: Platform) -> String {
        format!("{} {}", self.executable(platform), self.merge_args.join(" "))
    }

    pub fn recognizes(&self, filename: &str) -> bool {
        self.lockfiles.contains(&filename)
    }
}

pub static NPM: PackageManager = PackageManager {
    name: "npm",
    lockfiles: &["package-lock.json", "npm-shrinkwrap.json"],
    executable: "npm",
    windows_suffix: ".cmd",
    merge_args: &[
        "install",
        "--package-lock-only",
        "--prefer-offline",
        "--no-audit",
        "--progress=false",
    ],
    text_merge: TextMerge::Always,
};

pub static PNPM: PackageManager = PackageManager {
    name: "pnpm",
    lockfiles: &["pnpm-lock.yaml"],
    executable: "pnpm",
    windows_suffix: ".cmd",
    merge_args: &[
        "install",
        "--lockfile-only",
        "--prefer-offline",
        "--no-optional",
    ],
    text_merge: TextMerge::Always,
};

pub static YARN_CLASSIC: PackageManager = PackageManager {
    name: "yarn-classic",
    lockfiles: &[YARN_LOCKFILE],
    executable: "yarn",
    windows_suffix: ".cmd",
    merge_args: &["install", "--frozen-lockfile"],
    text_merge: TextMerge::Always,
};

pub static YARN_BERRY: PackageManager = PackageManager {
    name: "yarn-berry",
    lockfiles: &[YARN_LOCKFILE],
    executable: "yarn",
    windows_suffix: ".cmd",
    merge_args: &["install", "--mode=skip-build"],
    text_merge: TextMerge::Always,
};

pub static BUN: PackageManager = PackageManager {
    name: "bun",
    lockfiles: &["bun.lock", "bun.lockb"],
    executable: "bun",
    windows_suffix: ".exe",
    merge_args: &["install", "--frozen-lockfile"],
    text_merge: TextMerge::OnlyFor("bun.lock"),
};

pub static DENO: PackageManager = PackageManager {
    name: "deno",
    lockfiles: &["deno.lock"],
    executable: "deno",
    windows_suffix: ".exe",
    merge_args: &["cache", "--reload"],
    text_merge: TextMerge::Always,
};

/// Registry order; the first match wins
pub static PACKAGE_MANAGERS: [&PackageManager; 6] =
    [&NPM, &PNPM, &YARN_CLASSIC, &YARN_BERRY, &BUN, &DENO];

/// Look up a descriptor by the basename of `path`.
///
/// For `yarn.lock` this is provisional (always classic); use
/// [`resolve`] to refine by content.
pub fn lookup(path: &Path) -> Option<&'static PackageManager> {
    let filename = basename(path)?;
    PACKAGE_MANAGERS
        .iter()
        .copied()
        .find(|pm| pm.recognizes(filename))
}

/// Look up a descriptor and, for `yarn.lock`, refine it by inspecting the
/// lockfile's directory.
pub fn resolve(path: &Path) -> Option<&'static PackageManager> {
    let pm = lookup(path)?;
    if basename(path) != Some(YARN_LOCKFILE) {
        return Some(pm);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let variant = yarn::detect(dir).unwrap_or(YarnVariant::Classic);
    debug!(%variant, "yarn.lock format");
    match variant {
        YarnVariant::Berry => Some(&YARN_BERRY),
        YarnVariant::Classic => Some(&YARN_CLASSIC),
    }
}

/// Union of every descriptor's lockfile patterns, in registry order
pub fn all_lockfile_patterns() -> Vec<&'static str> {
    let mut seen = BTreeSet::new();
    PACKAGE_MANAGERS
        .iter()
        .flat_map(|pm| pm.lockfiles.iter().copied())
        .filter(|name| seen.insert(*name))
        .collect()
}

fn basename(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
