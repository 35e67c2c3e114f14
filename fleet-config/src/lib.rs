//! Domain-driven configuration for the ollama fleet harness
//!
//! Configuration is split by functional domain (server instance, fleet
//! layout, job driver, logging). Every domain has built-in defaults, can be
//! read from a YAML file and is overridden by `OLLAMA_*` environment
//! variables. Command-line flags sit on top of all of that and are applied
//! by the caller through [`InstanceOverrides`].

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    driver::DriverConfig,
    fleet::FleetConfig,
    instance::{InstanceConfig, InstanceOverrides},
    logging::{LogFormat, LogLevel, LoggingConfig},
    HarnessConfig,
};
