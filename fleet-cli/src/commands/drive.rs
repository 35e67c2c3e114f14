use anyhow::{Context, Result};
use colored::Colorize;
use fleet_config::HarnessConfig;
use fleet_driver::Driver;

/// Run `jobs` concurrent streaming jobs and wait for all of them
pub async fn drive_command(config: &HarnessConfig, jobs: u16, single_port: bool) -> Result<()> {
    let mut driver_config = config.driver.clone();
    if single_port {
        driver_config.multiport = false;
    }

    let driver = Driver::new(driver_config, config.fleet.base_port)
        .context("Failed to prepare driver jobs")?;
    let outcomes = driver
        .run(usize::from(jobs))
        .await
        .context("Failed to start driver jobs")?;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(output) => println!(
                "{} {} (port {}): {} chars",
                outcome.name,
                "ok".green(),
                outcome.port,
                output.chars().count()
            ),
            Err(e) => println!(
                "{} {} (port {}): {}",
                outcome.name,
                "failed".red(),
                outcome.port,
                e
            ),
        }
    }

    Ok(())
}
