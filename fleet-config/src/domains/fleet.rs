//! Multi-instance layout configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// How instances are laid out across ports and multiplexer sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    /// First port of the allocated range
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Prefix of every session name; also the teardown filter
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Terminal multiplexer executable
    #[serde(default = "default_multiplexer")]
    pub multiplexer: String,

    /// Named tmux server socket (`tmux -L`); the default server when unset
    #[serde(default)]
    pub socket: Option<String>,

    /// Shell started after the server exits so the session stays inspectable
    #[serde(default = "default_fallback_shell")]
    pub fallback_shell: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            session_prefix: default_session_prefix(),
            multiplexer: default_multiplexer(),
            socket: None,
            fallback_shell: default_fallback_shell(),
        }
    }
}

impl Validatable for FleetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.base_port, "base_port", self.domain_name())?;
        validate_required_string(&self.session_prefix, "session_prefix", self.domain_name())?;
        validate_required_string(&self.multiplexer, "multiplexer", self.domain_name())?;
        validate_required_string(&self.fallback_shell, "fallback_shell", self.domain_name())?;
        if let Some(socket) = &self.socket {
            validate_required_string(socket, "socket", self.domain_name())?;
        }

        // tmux rejects session names containing these
        if self.session_prefix.contains(&['.', ':'][..]) {
            return Err(self.validation_error(format!(
                "session_prefix '{}' must not contain '.' or ':'",
                self.session_prefix
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "fleet"
    }
}

fn default_base_port() -> u16 {
    11434
}

fn default_session_prefix() -> String {
    "ollama-".to_string()
}

fn default_multiplexer() -> String {
    "tmux".to_string()
}

fn default_fallback_shell() -> String {
    "bash".to_string()
}
