use anyhow::{Context, Result};
use fleet_config::HarnessConfig;
use tracing::info;

/// Print the effective configuration
pub fn config_show_command(config: &HarnessConfig, format: &str) -> Result<()> {
    info!("Showing configuration (format: {})", format);

    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml = serde_yaml::to_string(config).context("Failed to serialize to YAML")?;
            print!("{}", yaml);
        }
        "json" => {
            let json =
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }

    Ok(())
}
