// src/bin/ccr.rs

use anyhow::{Context, Result};
use ccr::{
    cli::{Cli, CodeArgs, Commands},
    core::{
        config_loader, environment,
        launcher::{LaunchOutcome, Launcher},
        paths,
    },
    models::{LaunchRequest, ProcessEnv},
    system::{
        executor::ParentStreams,
        service::{self, ServiceLifecycle},
        settings_store::FileSettingsStore,
    },
};
use clap::Parser;
use colored::*;

/// The main entry point of `ccr`.
/// Sets up logging, parses arguments, runs the launch and turns its outcome
/// into the process exit code. This is the only place the process exits.
#[tokio::main]
async fn main() {
    env_logger::init();

    match run_cli(Cli::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("\n{}: {:#}", ccr::t!("cli.error.prefix").red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run_cli(cli: Cli) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli);
    match cli.command {
        Commands::Code(args) => run_code(args).await,
    }
}

async fn run_code(args: CodeArgs) -> Result<i32> {
    // Everything the launcher needs is read once, here.
    let config = config_loader::load_global_config().context("Failed to load config.json")?;
    let preset = args
        .preset
        .as_deref()
        .map(config_loader::load_preset)
        .transpose()?;
    let env_overrides = args.env_overrides()?;

    let service = service::default_service_lifecycle(&paths::get_pid_file_path()?);
    let suppress_server_start = preset
        .as_ref()
        .is_some_and(|p| p.suppresses_server_start());
    if !suppress_server_start && !service.is_running() {
        eprintln!("{}", ccr::t!("service.warn.not_running").yellow());
    }

    let base_env = environment::create_env_variables(&config);
    let launcher = Launcher::new(
        config,
        base_env,
        ProcessEnv::from_env(),
        Box::new(FileSettingsStore::new(paths::get_settings_dir())),
        Box::new(service),
    );

    let request = LaunchRequest {
        args: args.args,
        preset,
        env_overrides,
        preset_name: args.preset,
    };

    let outcome = launcher.launch(&request, ParentStreams::stdio()).await?;
    match &outcome {
        LaunchOutcome::SpawnFailed { error } => {
            eprintln!(
                "\n{}",
                format!(ccr::t!("launch.error.spawn"), error = error).red()
            );
            eprintln!("{}", ccr::t!("launch.hint.install").dimmed());
        }
        LaunchOutcome::Exited { status_code } => {
            let code = status_code.unwrap_or(0);
            log::debug!("{}", format!(ccr::t!("launch.info.exit_code"), code = code));
        }
    }
    Ok(outcome.exit_code())
}
