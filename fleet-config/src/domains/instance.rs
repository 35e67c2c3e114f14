//! Single server instance configuration

use crate::error::ConfigResult;
use crate::validation::{
    validate_duration_string, validate_positive, validate_required_string, Validatable,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved tunables for one inference server process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstanceConfig {
    /// Address the server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory where the server stores pulled models
    #[serde(default = "default_model_directory")]
    pub model_directory: PathBuf,

    /// How long models stay loaded after the last request (`5m`, `-1`, ...)
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    /// Maximum number of requests served in parallel per model
    #[serde(default = "default_num_parallel")]
    pub num_parallel: u32,

    /// Maximum number of models loaded at the same time
    #[serde(default = "default_max_loaded_models")]
    pub max_loaded_models: u32,

    /// Enable flash attention
    #[serde(default = "crate::domains::utils::default_false")]
    pub flash_attention: bool,

    /// Enable server debug logging
    #[serde(default = "crate::domains::utils::default_false")]
    pub debug: bool,

    /// Server executable looked up on `PATH`
    #[serde(default = "default_server_binary")]
    pub server_binary: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_directory: default_model_directory(),
            keep_alive: default_keep_alive(),
            num_parallel: default_num_parallel(),
            max_loaded_models: default_max_loaded_models(),
            flash_attention: false,
            debug: false,
            server_binary: default_server_binary(),
        }
    }
}

impl InstanceConfig {
    /// The `host:port` pair the server listens on
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Return a copy with command-line overrides applied on top
    pub fn with_overrides(mut self, overrides: &InstanceOverrides) -> Self {
        overrides.apply_to(&mut self);
        self
    }
}

impl Validatable for InstanceConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.host, "host", self.domain_name())?;
        validate_positive(self.port, "port", self.domain_name())?;
        validate_required_string(
            &self.model_directory.to_string_lossy(),
            "model_directory",
            self.domain_name(),
        )?;
        validate_duration_string(&self.keep_alive, "keep_alive", self.domain_name())?;
        validate_positive(self.num_parallel, "num_parallel", self.domain_name())?;
        validate_positive(self.max_loaded_models, "max_loaded_models", self.domain_name())?;
        validate_required_string(&self.server_binary, "server_binary", self.domain_name())?;

        if self.host.contains(char::is_whitespace) {
            return Err(self.validation_error(format!("host '{}' contains whitespace", self.host)));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "instance"
    }
}

/// Explicit per-invocation overrides, highest precedence.
///
/// `None` leaves the underlying value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_directory: Option<PathBuf>,
    pub keep_alive: Option<String>,
    pub num_parallel: Option<u32>,
    pub max_loaded_models: Option<u32>,
    pub flash_attention: Option<bool>,
    pub debug: Option<bool>,
}

impl InstanceOverrides {
    /// Overlay these overrides onto `config`
    pub fn apply_to(&self, config: &mut InstanceConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.model_directory {
            config.model_directory = dir.clone();
        }
        if let Some(keep_alive) = &self.keep_alive {
            config.keep_alive = keep_alive.clone();
        }
        if let Some(parallel) = self.num_parallel {
            config.num_parallel = parallel;
        }
        if let Some(max_loaded) = self.max_loaded_models {
            config.max_loaded_models = max_loaded;
        }
        if let Some(on) = self.flash_attention {
            config.flash_attention = on;
        }
        if let Some(on) = self.debug {
            config.debug = on;
        }
    }
}

/// Reduce an `OLLAMA_HOST` value to a bare host.
///
/// The server itself accepts `OLLAMA_HOST` as `scheme://host:port`; the
/// harness keeps the port separately, so scheme and port are stripped here.
pub fn normalize_host(value: &str) -> String {
    let value = value.trim();
    let without_scheme = value
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(value)
        .trim_end_matches('/');

    // Bracketed IPv6, optionally followed by a port
    if let Some(rest) = without_scheme.strip_prefix('[') {
        if let Some((inner, _)) = rest.split_once(']') {
            return format!("[{}]", inner);
        }
    }

    match without_scheme.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':')
                && !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            host.to_string()
        }
        _ => without_scheme.to_string(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    11434
}

fn default_model_directory() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ollama").join("models"))
        .unwrap_or_else(|| PathBuf::from(".ollama/models"))
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

fn default_num_parallel() -> u32 {
    1
}

fn default_max_loaded_models() -> u32 {
    1
}

fn default_server_binary() -> String {
    "ollama".to_string()
}
