//! Load-generation job driver configuration

use crate::error::ConfigResult;
use crate::validation::{validate_range, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder substituted with each job's target port
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Settings for the concurrent chat-completion jobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// OpenAI-compatible base URL template, must contain `{port}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model tag requested from the server
    #[serde(default = "default_model")]
    pub model: String,

    /// File holding the system prompt
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: PathBuf,

    /// File holding the user prompt
    #[serde(default = "default_user_prompt_path")]
    pub user_prompt_path: PathBuf,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub top_p: f32,

    /// Leave reasoning on for models that support switching it off
    #[serde(default = "crate::domains::utils::default_false")]
    pub enable_thinking: bool,

    /// Spread jobs across `base_port + i` instead of a single port
    #[serde(default = "crate::domains::utils::default_true")]
    pub multiport: bool,

    /// Directory receiving one log file per job
    #[serde(default = "default_log_folder")]
    pub log_folder: PathBuf,

    /// Bearer token; local servers accept anything
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            system_prompt_path: default_system_prompt_path(),
            user_prompt_path: default_user_prompt_path(),
            temperature: 0.0,
            top_p: 0.0,
            enable_thinking: false,
            multiport: true,
            log_folder: default_log_folder(),
            api_key: default_api_key(),
        }
    }
}

impl DriverConfig {
    /// Base URL for a concrete port
    pub fn endpoint_for(&self, port: u16) -> String {
        self.endpoint.replace(PORT_PLACEHOLDER, &port.to_string())
    }
}

impl Validatable for DriverConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.endpoint.contains(PORT_PLACEHOLDER) {
            return Err(self.validation_error(format!(
                "endpoint '{}' must contain the {} placeholder",
                self.endpoint, PORT_PLACEHOLDER
            )));
        }
        validate_url(&self.endpoint_for(1), "endpoint", self.domain_name())?;
        validate_required_string(&self.model, "model", self.domain_name())?;
        validate_range(self.temperature, 0.0, 2.0, "temperature", self.domain_name())?;
        validate_range(self.top_p, 0.0, 1.0, "top_p", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "driver"
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:{port}/v1".to_string()
}

fn default_model() -> String {
    "qwen3:32b-fp16-cm".to_string()
}

fn default_system_prompt_path() -> PathBuf {
    PathBuf::from("./prompts/system.txt")
}

fn default_user_prompt_path() -> PathBuf {
    PathBuf::from("./prompts/user.txt")
}

fn default_log_folder() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_api_key() -> String {
    "ollama".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_substitution() {
        let config = DriverConfig::default();
        assert_eq!(config.endpoint_for(11435), "http://127.0.0.1:11435/v1");
    }

    #[test]
    fn test_endpoint_requires_placeholder() {
        let config = DriverConfig {
            endpoint: "http://127.0.0.1:11434/v1".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{port}"));
    }

    #[test]
    fn test_sampling_ranges() {
        let config = DriverConfig {
            top_p: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
