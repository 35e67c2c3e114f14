//! Domain-specific configuration modules

pub mod driver;
pub mod fleet;
pub mod instance;
pub mod logging;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Complete harness configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Single server instance tunables
    #[serde(default)]
    pub instance: instance::InstanceConfig,

    /// Multi-instance layout (base port, session prefix, multiplexer)
    #[serde(default)]
    pub fleet: fleet::FleetConfig,

    /// Load-generation job driver
    #[serde(default)]
    pub driver: driver::DriverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl HarnessConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.instance.validate()?;
        self.fleet.validate()?;
        self.driver.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
