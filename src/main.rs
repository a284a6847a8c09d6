use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use lockmerge::cli::{AppContext, Cli, Commands};
use lockmerge::cli_ext::driver_cmd;
use lockmerge::core::DriverError;
use lockmerge::infra::logging;
use miette::Diagnostic;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    logging::init(&ctx);
    let span = tracing::info_span!("lockmerge");
    let _guard = span.enter();

    match dispatch(cli.command, &ctx) {
        Ok(code) => code,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands, ctx: &AppContext) -> Result<ExitCode> {
    match command {
        Commands::Merge(args) => driver_cmd::merge(args),
        Commands::Install(args) => driver_cmd::install(args),
        Commands::Uninstall => driver_cmd::uninstall(),
        Commands::Status => driver_cmd::status(ctx),
        Commands::Detect(args) => driver_cmd::detect(args, ctx),
        Commands::Init(args) => lockmerge::infra::config_init(args, ctx).map(|()| ExitCode::SUCCESS),
        Commands::Completions(args) => {
            lockmerge::completion::run(args).map(|()| ExitCode::SUCCESS)
        }
    }
}

fn report(err: &anyhow::Error) {
    let Some(driver_err) = err.downcast_ref::<DriverError>() else {
        error!("{err:#}");
        return;
    };

    error!("{driver_err}");
    if let Some((stdout, stderr)) = driver_err.captured_output() {
        if !stdout.trim().is_empty() {
            error!("stdout:\n{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            error!("stderr:\n{}", stderr.trim_end());
        }
    }
    if let Some(help) = driver_err.help() {
        error!("ACTION REQUIRED: {help}");
    }
}
