//! Yarn classic vs berry detection from `yarn.lock` content.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::core::registry::YARN_LOCKFILE;

const BERRY_MARKER: &str = "__metadata";
const CLASSIC_HEADER: &str = "# yarn lockfile v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YarnVariant {
    Classic,
    Berry,
}

impl fmt::Display for YarnVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YarnVariant::Classic => "classic",
            YarnVariant::Berry => "berry",
        })
    }
}

/// Classify `yarn.lock` text. Unrecognized content falls back to classic.
pub fn classify(content: &str) -> (YarnVariant, bool) {
    if content.contains(BERRY_MARKER) {
        (YarnVariant::Berry, true)
    } else if content.starts_with(CLASSIC_HEADER) {
        (YarnVariant::Classic, true)
    } else {
        (YarnVariant::Classic, false)
    }
}

/// Detect the variant of `<dir>/yarn.lock`.
///
/// Returns `None` when the file is absent or unreadable.
pub fn detect(dir: &Path) -> Option<YarnVariant> {
    let lockfile = dir.join(YARN_LOCKFILE);
    if !lockfile.exists() {
        return None;
    }

    let content = fs::read_to_string(&lockfile).ok()?;
    let (variant, recognized) = classify(&content);
    if !recognized {
        warn!(
            dir = %dir.display(),
            "unknown yarn.lock format, defaulting to classic"
        );
    }
    Some(variant)
}
