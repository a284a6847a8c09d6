use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::package_json::ConflictStrategy;

/// Config file names probed in the repository root, first match wins
pub const CONFIG_FILES: [&str; 2] = [".lockmerge.toml", "lockmerge.toml"];

/// Environment prefix, e.g. `LOCKMERGE_SKIP_INSTALL=true`
pub const ENV_PREFIX: &str = "LOCKMERGE";

/// Installation settings. Merge-time behaviour is read from git config only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Never register the driver (e.g. from a package install hook)
    pub skip_install: bool,

    /// Register even when a CI environment is detected
    pub ignore_ci: bool,

    /// Strategy stored at install time when no flag is given
    pub resolve_package_json: Option<ConflictStrategy>,
}

/// Layer defaults, the optional config file in `root`, then the environment
pub fn load_settings(root: &Path) -> Result<Settings> {
    let mut builder = config::Config::builder();

    if let Some(path) = find_config_file(root) {
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true),
    );

    let cfg = builder.build().context("Failed to load configuration")?;
    let parsed: Settings = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let config_path = args.path.join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string = toml::to_string_pretty(&Settings::default())
        .context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
