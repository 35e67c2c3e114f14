//! CLI command implementations

pub mod config;
pub mod down;
pub mod drive;
pub mod launch;
pub mod up;

pub use config::config_show_command;
pub use down::down_command;
pub use drive::drive_command;
pub use launch::launch_command;
pub use up::up_command;
