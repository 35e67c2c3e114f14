//! Utility functions and helpers for configuration

use crate::error::{ConfigError, ConfigResult};

/// Default functions for serde
pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

/// Parse a boolean toggle the way shell configuration files spell them
pub fn parse_bool_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::EnvError(format!(
            "Invalid {}: '{}' is not a boolean",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_flag() {
        assert!(parse_bool_flag("OLLAMA_DEBUG", "1").unwrap());
        assert!(parse_bool_flag("OLLAMA_DEBUG", "TRUE").unwrap());
        assert!(!parse_bool_flag("OLLAMA_DEBUG", "0").unwrap());
        assert!(!parse_bool_flag("OLLAMA_DEBUG", "off").unwrap());
        assert!(parse_bool_flag("OLLAMA_DEBUG", "maybe").is_err());
    }
}
