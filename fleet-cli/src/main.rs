//! fleet CLI main entry point

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use fleet_config::{ConfigLoader, HarnessConfig, LoggingConfig};
use fleet_core::{ErrorKind, FleetError};
use std::process::ExitCode;
use tracing::debug;

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let loader = ConfigLoader::new();
    match &cli.config {
        Some(path) => loader
            .load(Some(path))
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => loader
            .load(None::<&std::path::Path>)
            .context("Failed to load configuration from environment"),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            // Still report through the configured channel
            let _ = fleet_logging::init_logging(&LoggingConfig::default(), cli.log_level.as_deref());
            return Err(e);
        }
    };

    fleet_logging::init_logging(&config.logging, cli.log_level.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    match &cli.command {
        Some(Commands::Launch(args)) => commands::launch_command(config, args),
        Some(Commands::Up { count }) => {
            commands::up_command(&config, cli.config.as_deref(), count).await
        }
        Some(Commands::Down) => {
            commands::down_command(&config).await;
            Ok(())
        }
        Some(Commands::Drive { jobs, single_port }) => {
            commands::drive_command(&config, *jobs, *single_port).await
        }
        Some(Commands::Config { config_cmd }) => match config_cmd {
            ConfigCommands::Show { format } => commands::config_show_command(&config, format),
        },
        None => {
            // If no subcommand is provided, print help
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            Ok(())
        }
    }
}

/// Print a failure, with the subcommand usage for malformed invocations
fn report(error: &anyhow::Error, subcommand: Option<&str>) {
    eprintln!("{} {:#}", "error:".red().bold(), error);

    let is_usage = error
        .downcast_ref::<FleetError>()
        .is_some_and(|e| e.kind() == ErrorKind::Usage);
    if !is_usage {
        return;
    }

    let mut cmd = Cli::command();
    let usage = match subcommand.and_then(|name| cmd.find_subcommand_mut(name)) {
        Some(sub) => sub.render_usage(),
        None => cmd.render_usage(),
    };
    eprintln!("\n{}", usage);
}

fn subcommand_name(command: Option<&Commands>) -> Option<&'static str> {
    command.map(|c| match c {
        Commands::Launch(_) => "launch",
        Commands::Up { .. } => "up",
        Commands::Down => "down",
        Commands::Drive { .. } => "drive",
        Commands::Config { .. } => "config",
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and succeed; anything else is a usage error
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let subcommand = subcommand_name(cli.command.as_ref());
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Command failed: {:?}", e);
            report(&e, subcommand);
            ExitCode::FAILURE
        }
    }
}
