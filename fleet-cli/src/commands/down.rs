use colored::Colorize;
use fleet_config::HarnessConfig;
use fleet_core::{Reaper, TmuxRegistry};

/// Kill every session carrying the fleet prefix; never fails
pub async fn down_command(config: &HarnessConfig) {
    let fleet = &config.fleet;
    let mut registry = TmuxRegistry::new(&fleet.multiplexer);
    if let Some(socket) = &fleet.socket {
        registry = registry.with_socket(socket);
    }
    let reaper = Reaper::new(&registry, &fleet.session_prefix);

    let sessions = reaper.matching_sessions().await;
    if sessions.is_empty() {
        println!("No sessions with prefix '{}' found", fleet.session_prefix);
        return;
    }

    println!("Found {} session(s):", sessions.len());
    for id in &sessions {
        println!("  {}", id);
    }

    let report = reaper
        .kill_all(&sessions, |id, result| match result {
            Ok(()) => println!("{} {}", "killed".green(), id),
            Err(e) => eprintln!("{} {}: {}", "failed".red(), id, e),
        })
        .await;

    println!(
        "Killed {} of {} session(s)",
        report.killed.len(),
        report.matched.len()
    );
}
