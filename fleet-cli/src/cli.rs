//! CLI argument parsing definitions

use clap::{ArgAction, Args, Parser, Subcommand};
use fleet_config::InstanceOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fleet", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start one ollama server in the foreground
    #[command(disable_help_flag = true)]
    Launch(LaunchArgs),

    /// Start N servers on consecutive ports, one detached session each
    Up {
        /// Number of instances
        #[arg(value_name = "N", allow_hyphen_values = true)]
        count: String,
    },

    /// Kill every session carrying the fleet prefix
    Down,

    /// Run concurrent streaming chat jobs against the fleet
    Drive {
        /// Number of concurrent jobs
        #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
        jobs: u16,

        /// Send every job to the base port instead of base port + job index
        #[arg(long)]
        single_port: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Flags of `fleet launch`; `-h` is the host, so help is `--help` only
#[derive(Args, Debug, Default)]
pub struct LaunchArgs {
    /// Address to bind
    #[arg(short = 'h', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'P', long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Model storage directory
    #[arg(short = 'm', long = "models", value_name = "DIR")]
    pub models: Option<PathBuf>,

    /// How long models stay loaded (e.g. 5m, 1h, -1)
    #[arg(short = 'k', long, value_name = "DURATION")]
    pub keep_alive: Option<String>,

    /// Parallel requests per model
    #[arg(short = 'p', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub parallel: Option<u32>,

    /// Models kept loaded at once
    #[arg(short = 'l', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_loaded: Option<u32>,

    /// Enable flash attention
    #[arg(short = 'f', long, overrides_with = "no_flash_attention")]
    pub flash_attention: bool,

    #[arg(long, hide = true, overrides_with = "flash_attention")]
    pub no_flash_attention: bool,

    /// Enable server debug logging
    #[arg(short = 'd', long, overrides_with = "no_debug")]
    pub debug: bool,

    #[arg(long, hide = true, overrides_with = "debug")]
    pub no_debug: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl LaunchArgs {
    pub fn overrides(&self) -> InstanceOverrides {
        InstanceOverrides {
            host: self.host.clone(),
            port: self.port,
            model_directory: self.models.clone(),
            keep_alive: self.keep_alive.clone(),
            num_parallel: self.parallel,
            max_loaded_models: self.max_loaded,
            flash_attention: toggle(self.flash_attention, self.no_flash_attention),
            debug: toggle(self.debug, self.no_debug),
        }
    }
}

/// Tri-state from an `--x`/`--no-x` pair; clap keeps only the last one given
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (defaults, file and environment)
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}
