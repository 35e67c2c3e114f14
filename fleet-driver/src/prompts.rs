use crate::error::{DriverError, DriverResult};
use fleet_config::DriverConfig;
use serde::Serialize;
use std::path::Path;

/// System and user prompt shared by every job of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

impl Prompts {
    /// Read both prompt files named in the driver configuration
    pub fn load(config: &DriverConfig) -> DriverResult<Self> {
        Ok(Self {
            system: read_prompt(&config.system_prompt_path)?,
            user: read_prompt(&config.user_prompt_path)?,
        })
    }
}

fn read_prompt(path: &Path) -> DriverResult<String> {
    std::fs::read_to_string(path).map_err(|source| DriverError::Prompt {
        path: path.to_path_buf(),
        source,
    })
}
