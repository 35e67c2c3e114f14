use anyhow::Result;
use fleet_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Pick the filter: explicit level, then `RUST_LOG`, then the configured level
pub fn resolve_filter(config: &LoggingConfig, cli_level: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", level);
            EnvFilter::new("info")
        });
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.to_string()))
}

/// Initialize the global subscriber from configuration.
///
/// Output goes to stderr; stdout carries narration and printed configuration.
pub fn init_logging(config: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    let env_filter = resolve_filter(config, cli_level);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // Use try_init to avoid panic if global subscriber already set
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_config::LogLevel;

    #[test]
    fn test_cli_level_wins() {
        let config = LoggingConfig {
            level: LogLevel::Error,
            ..Default::default()
        };
        let filter = resolve_filter(&config, Some("trace"));
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config, Some("warn")).is_ok());
        assert!(init_logging(&config, Some("warn")).is_ok());
    }
}
