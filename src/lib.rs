//! **lockmerge** - git merge driver for package-manager lockfiles
//!
//! Instead of merging lockfile text, the driver lets the package manager that
//! owns the lockfile regenerate it from the merged `package.json`.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Subcommand handlers
pub mod cli_ext {
    pub mod driver_cmd;
}

/// Merge driver core
pub mod core {
    /// Error taxonomy with remediation hints
    pub mod error;
    pub use error::{DriverError, DriverResult};

    /// Package-manager registry and lockfile lookup
    pub mod registry;
    pub use registry::{PACKAGE_MANAGERS, PackageManager, Platform};

    /// Yarn classic vs berry detection
    pub mod yarn;

    /// Conflict-marker detection, synthesis and splitting
    pub mod conflict;

    /// Thin git plumbing over a command runner
    pub mod git;

    /// package.json conflict resolution (ours/theirs)
    pub mod package_json;
    pub use package_json::ConflictStrategy;

    /// The merge driver algorithm
    pub mod merge;
    pub use merge::{MergeEngine, MergeInvocation, MergeReport};

    /// Driver registration in git config and attributes
    pub mod install;
    pub use install::{InstallOptions, Installer};

    /// Lockfile discovery in a directory
    pub mod detect;
}

/// Infrastructure - configuration, logging and subprocesses
pub mod infra {
    /// Layered settings from TOML and environment
    pub mod config;
    pub use config::{Settings, init as config_init, load_settings};

    /// tracing subscriber setup
    pub mod logging;

    /// Subprocess seam
    pub mod process;
    pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
}

pub use cli::{AppContext, Cli, Commands};
pub use core::{DriverError, MergeEngine};
pub use infra::{Settings, load_settings};
