//! Configuration loading and environment variable handling

use crate::domains::utils::parse_bool_flag;
use crate::domains::{driver, fleet, instance, logging, HarnessConfig};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader reading `OLLAMA_*` variables
    pub fn new() -> Self {
        Self {
            prefix: "OLLAMA".to_string(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<HarnessConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: HarnessConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<HarnessConfig> {
        let mut config = HarnessConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<HarnessConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut HarnessConfig) -> ConfigResult<()> {
        self.apply_instance_overrides(&mut config.instance)?;
        self.apply_fleet_overrides(&mut config.fleet)?;
        self.apply_driver_overrides(&mut config.driver)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply server tunable overrides
    fn apply_instance_overrides(&self, config: &mut instance::InstanceConfig) -> ConfigResult<()> {
        if let Some(host) = self.get_env_var("HOST") {
            config.host = instance::normalize_host(&host);
        }

        if let Some(port) = self.get_env_var("PORT") {
            config.port = self.parse_var("PORT", &port)?;
        }

        if let Some(models) = self.get_env_var("MODELS") {
            config.model_directory = PathBuf::from(models);
        }

        if let Some(keep_alive) = self.get_env_var("KEEP_ALIVE") {
            config.keep_alive = keep_alive;
        }

        if let Some(parallel) = self.get_env_var("NUM_PARALLEL") {
            config.num_parallel = self.parse_var("NUM_PARALLEL", &parallel)?;
        }

        if let Some(max_loaded) = self.get_env_var("MAX_LOADED_MODELS") {
            config.max_loaded_models = self.parse_var("MAX_LOADED_MODELS", &max_loaded)?;
        }

        if let Some(flash) = self.get_env_var("FLASH_ATTENTION") {
            config.flash_attention = parse_bool_flag(&self.var_name("FLASH_ATTENTION"), &flash)?;
        }

        if let Some(debug) = self.get_env_var("DEBUG") {
            config.debug = parse_bool_flag(&self.var_name("DEBUG"), &debug)?;
        }

        Ok(())
    }

    /// Apply fleet layout overrides
    fn apply_fleet_overrides(&self, config: &mut fleet::FleetConfig) -> ConfigResult<()> {
        if let Some(port) = self.get_env_var("PORT") {
            config.base_port = self.parse_var("PORT", &port)?;
        }

        if let Some(prefix) = self.get_env_var("TMUX_SESSION_PREFIX") {
            config.session_prefix = prefix;
        }

        if let Some(socket) = self.get_env_var("TMUX_SOCKET") {
            config.socket = Some(socket);
        }

        Ok(())
    }

    /// Apply job driver overrides
    fn apply_driver_overrides(&self, config: &mut driver::DriverConfig) -> ConfigResult<()> {
        if let Some(endpoint) = self.get_env_var("ENDPOINT") {
            config.endpoint = endpoint;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut logging::LoggingConfig) -> ConfigResult<()> {
        if let Some(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Some(format) = self.get_env_var("LOG_FORMAT") {
            config.format = logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn parse_var<T>(&self, name: &str, value: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value.trim().parse().map_err(|e| {
            ConfigError::EnvError(format!("Invalid {}: {}", self.var_name(name), e))
        })
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    /// Get a non-empty environment variable with prefix
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(self.var_name(name))
            .ok()
            .filter(|value| !value.is_empty())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
