use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::package_json::ConflictStrategy;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
}

#[derive(Parser)]
#[command(name = "lockmerge")]
#[command(
    about = "A git merge driver that resolves package-manager lockfile conflicts by regenerating them"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge driver entry point, invoked by git as `merge %A %O %B %P`
    Merge(MergeArgs),

    /// Register the merge driver in this repository
    Install(InstallArgs),

    /// Remove the merge driver from this repository
    Uninstall,

    /// Exit 0 if the merge driver is registered, 1 otherwise
    Status,

    /// List package managers whose lockfiles are present
    Detect(DetectArgs),

    /// Initialize a .lockmerge.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Parser)]
pub struct MergeArgs {
    /// Current version (%A); receives the merged result
    pub current: PathBuf,

    /// Common ancestor version (%O)
    pub ancestor: PathBuf,

    /// Other branch's version (%B)
    pub other: PathBuf,

    /// Path of the file being merged, relative to the repository root (%P)
    pub path: PathBuf,
}

#[derive(Debug, Parser)]
pub struct InstallArgs {
    /// Automatically resolve package.json conflicts with this strategy
    #[arg(long, value_enum)]
    pub resolve_package_json: Option<ConflictStrategy>,

    /// Command git runs for the driver (defaults to this executable)
    #[arg(long)]
    pub driver_command: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DetectArgs {
    /// Directory to inspect
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory where .lockmerge.toml is written
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Print to stdout
    #[arg(long, conflicts_with = "out_dir")]
    pub stdout: bool,

    /// Directory to write the completion file into
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
