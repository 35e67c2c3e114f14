//! Error types for fleet orchestration

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fleet operations
pub type FleetResult<T> = std::result::Result<T, FleetError>;

/// How a failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed invocation; nothing was touched
    Usage,
    /// A required external tool is missing
    Environment,
    /// Target session already exists; skip and continue
    Conflict,
    /// Anything that went wrong while talking to the outside world
    Runtime,
}

/// Fleet orchestration errors
#[derive(Debug, Error)]
pub enum FleetError {
    /// Invalid user input
    #[error("{0}")]
    Usage(String),

    /// Executable not resolvable on PATH
    #[error("required executable '{name}' was not found on PATH")]
    MissingExecutable { name: String },

    /// Session name already taken
    #[error("session '{0}' already exists")]
    SessionExists(String),

    /// Session disappeared or never existed
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// The multiplexer ran but reported failure
    #[error("`{command}` failed: {stderr}")]
    Multiplexer { command: String, stderr: String },

    /// Model directory could not be created
    #[error("failed to create model directory {path:?}: {source}")]
    ModelDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A process could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl FleetError {
    /// Classify the error for exit-code and skip decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::Usage(_) => ErrorKind::Usage,
            FleetError::MissingExecutable { .. } => ErrorKind::Environment,
            FleetError::SessionExists(_) => ErrorKind::Conflict,
            FleetError::SessionNotFound(_)
            | FleetError::Multiplexer { .. }
            | FleetError::ModelDirectory { .. }
            | FleetError::Spawn { .. } => ErrorKind::Runtime,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        FleetError::Usage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FleetError::usage("bad count").kind(), ErrorKind::Usage);
        assert_eq!(
            FleetError::MissingExecutable {
                name: "ollama".into()
            }
            .kind(),
            ErrorKind::Environment
        );
        assert_eq!(
            FleetError::SessionExists("llm-11434".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            FleetError::SessionNotFound("llm-11434".into()).kind(),
            ErrorKind::Runtime
        );
    }

    #[test]
    fn test_missing_executable_message() {
        let err = FleetError::MissingExecutable {
            name: "ollama".into(),
        };
        assert_eq!(
            err.to_string(),
            "required executable 'ollama' was not found on PATH"
        );
    }
}
