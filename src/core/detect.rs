//! Which package managers have lockfiles in a directory.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::registry::{self, PackageManager};

#[derive(Debug, Clone, Serialize)]
pub struct DetectedManager {
    pub name: &'static str,
    pub lockfile: PathBuf,
    pub text_merge: bool,
    pub command: String,
}

/// One entry per package manager, in registry pattern order. A manager with
/// several lockfiles present (bun) is reported once, for the first pattern.
pub fn detect_package_managers(dir: &Path) -> Vec<DetectedManager> {
    let platform = registry::Platform::current();
    let mut found: IndexMap<&'static str, (&'static PackageManager, PathBuf)> = IndexMap::new();

    for pattern in registry::all_lockfile_patterns() {
        let lockfile = dir.join(pattern);
        if !lockfile.is_file() {
            continue;
        }
        let Some(pm) = registry::resolve(&lockfile) else {
            continue;
        };
        found.entry(pm.name).or_insert((pm, lockfile));
    }

    found
        .into_values()
        .map(|(pm, lockfile)| DetectedManager {
            name: pm.name,
            text_merge: pm.supports_text_merge(&lockfile),
            command: pm.merge_command(platform),
            lockfile,
        })
        .collect()
}
