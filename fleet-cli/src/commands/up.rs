use anyhow::{Context, Result};
use colored::Colorize;
use fleet_config::HarnessConfig;
use fleet_core::{
    resolve_executable, Allocator, FleetError, InstanceCount, LaunchCommand, Placement,
    TmuxRegistry,
};
use std::path::Path;

/// Start `count` instances in detached sessions
pub async fn up_command(
    config: &HarnessConfig,
    config_path: Option<&Path>,
    count: &str,
) -> Result<()> {
    let count = InstanceCount::parse(count)?;
    let fleet = &config.fleet;

    let search_path = std::env::var_os("PATH");
    if resolve_executable(&fleet.multiplexer, search_path.as_deref()).is_none() {
        return Err(FleetError::MissingExecutable {
            name: fleet.multiplexer.clone(),
        }
        .into());
    }

    let exe = std::env::current_exe().context("Failed to locate the fleet executable")?;
    let mut command =
        LaunchCommand::new(exe, &fleet.fallback_shell).with_instance(&config.instance);
    if let Some(path) = config_path {
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve config path {:?}", path))?;
        command = command.with_args(["--config".to_string(), path.to_string_lossy().into_owned()]);
    }

    let mut registry = TmuxRegistry::new(&fleet.multiplexer);
    if let Some(socket) = &fleet.socket {
        registry = registry.with_socket(socket);
    }
    let allocator = Allocator::new(&registry, &fleet.session_prefix, fleet.base_port, command);
    let range = allocator.plan(count)?;

    println!(
        "Starting {} instance(s) on ports {}-{}",
        range.len(),
        range.base(),
        range.last()
    );

    let host = &config.instance.host;
    let total = range.len();
    allocator
        .allocate_with(count, |index, placement| {
            let position = format!("[{}/{}]", index + 1, total);
            match placement {
                Placement::Launched { port, handle } => println!(
                    "{} {} session {} listening on {}:{}",
                    position,
                    "started".green(),
                    handle.id.to_string().cyan(),
                    host,
                    port
                ),
                Placement::Skipped { port, session } => println!(
                    "{} {} session {} already exists, port {} left alone",
                    position,
                    "skipped".yellow(),
                    session.to_string().cyan(),
                    port
                ),
                Placement::Failed {
                    port,
                    session,
                    reason,
                } => eprintln!(
                    "{} {} session {} on port {}: {}",
                    position,
                    "failed".red(),
                    session,
                    port,
                    reason
                ),
            }
        })
        .await?;

    Ok(())
}
