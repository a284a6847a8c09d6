//! CLI command handlers for the merge driver and its registration.
//!
//! Each handler returns the process exit code; fatal errors propagate as
//! `anyhow::Error` and are reported by `main`.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};
use tracing::{error, info, instrument};

use crate::cli::{AppContext, DetectArgs, InstallArgs, MergeArgs};
use crate::core::detect::detect_package_managers;
use crate::core::error::DriverError;
use crate::core::git::Git;
use crate::core::install::{InstallOptions, Installer, skip_reason};
use crate::core::merge::{MergeEngine, MergeInvocation};
use crate::infra::config::load_settings;
use crate::infra::process::SystemRunner;

/// Directory the command acts on; `INIT_CWD` wins when run from a package
/// manager lifecycle script
fn invocation_dir() -> Result<PathBuf> {
    match env::var_os("INIT_CWD") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => env::current_dir().context("Failed to read current directory"),
    }
}

/// `merge %A %O %B %P`
#[instrument(skip_all)]
pub fn merge(args: MergeArgs) -> Result<ExitCode> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let invocation = MergeInvocation::resolve(
        &SystemRunner,
        &cwd,
        &args.current,
        &args.ancestor,
        &args.other,
        &args.path,
    );

    MergeEngine::new(&SystemRunner).run(&invocation)?;
    Ok(ExitCode::SUCCESS)
}

pub fn install(args: InstallArgs) -> Result<ExitCode> {
    let cwd = invocation_dir()?;
    let root = Git::new(&SystemRunner, &cwd)
        .show_toplevel()
        .unwrap_or_else(|| cwd.clone());
    let settings = load_settings(&root)?;

    if let Some(reason) = skip_reason(&settings) {
        info!("{reason}");
        return Ok(ExitCode::SUCCESS);
    }

    let strategy = args.resolve_package_json.or(settings.resolve_package_json);
    let options = match args.driver_command {
        Some(driver_command) => InstallOptions {
            driver_command,
            strategy,
        },
        None => {
            let exe = env::current_exe().context("Failed to locate the lockmerge executable")?;
            InstallOptions::for_executable(&exe, strategy)
        }
    };

    match Installer::new(&SystemRunner, cwd).install(&options) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err @ DriverError::NotARepository { .. }) => {
            error!("{err}, skipping install.");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn uninstall() -> Result<ExitCode> {
    Installer::new(&SystemRunner, invocation_dir()?).uninstall()?;
    Ok(ExitCode::SUCCESS)
}

pub fn status(ctx: &AppContext) -> Result<ExitCode> {
    let installed = Installer::new(&SystemRunner, invocation_dir()?).is_installed();

    let label = if installed { "installed" } else { "not installed" };
    if ctx.no_color {
        println!("lockmerge: {label}");
    } else if installed {
        println!("lockmerge: {}", label.green().bold());
    } else {
        println!("lockmerge: {}", label.red().bold());
    }

    Ok(if installed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn detect(args: DetectArgs, ctx: &AppContext) -> Result<ExitCode> {
    let detected = detect_package_managers(&args.path);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&detected).context("Failed to serialize detection")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    if detected.is_empty() {
        if !ctx.quiet {
            println!("No lockfiles found in {}", args.path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Manager")]
        manager: String,
        #[tabled(rename = "Lockfile")]
        lockfile: String,
        #[tabled(rename = "Text merge")]
        text_merge: String,
        #[tabled(rename = "Regenerate with")]
        command: String,
    }

    let rows: Vec<Row> = detected
        .iter()
        .map(|d| Row {
            manager: if ctx.no_color {
                d.name.to_string()
            } else {
                d.name.cyan().to_string()
            },
            lockfile: d
                .lockfile
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            text_merge: if d.text_merge { "yes" } else { "no" }.to_string(),
            command: d.command.clone(),
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(ExitCode::SUCCESS)
}
