use crate::cli::LaunchArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use fleet_config::domains::instance::normalize_host;
use fleet_config::validation::Validatable;
use fleet_config::HarnessConfig;
use fleet_core::Launcher;

/// Resolve one instance's configuration and become its server process
pub fn launch_command(config: HarnessConfig, args: &LaunchArgs) -> Result<()> {
    let mut overrides = args.overrides();
    overrides.host = overrides.host.as_deref().map(normalize_host);

    let instance = config.instance.with_overrides(&overrides);
    instance.validate().context("Invalid instance configuration")?;

    let launcher = Launcher::new(instance);
    // Fail before printing anything when the server is not installed
    launcher.resolve_server()?;

    println!("{}", "Starting ollama with:".green().bold());
    for (label, value) in launcher.describe() {
        println!("  {:<16} {}", format!("{}:", label), value.cyan());
    }

    match launcher.run_foreground() {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}
