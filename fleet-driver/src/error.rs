//! Job driver error types

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failures of a driver run or of a single job
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(#[from] fleet_config::ConfigError),

    #[error("Failed to read prompt {path:?}: {source}")]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set up job logging: {0}")]
    Logging(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error ({status}): {body}")]
    Server { status: StatusCode, body: String },

    #[error("API status error: received status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to connect to the API, check the network connection: {0}")]
    Connection(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Failed to decode streamed chunk: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Job task failed: {0}")]
    Task(String),
}

impl DriverError {
    /// Map a non-success HTTP status onto the error taxonomy
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => DriverError::Authentication(body),
            StatusCode::TOO_MANY_REQUESTS => DriverError::RateLimited(body),
            StatusCode::BAD_REQUEST => DriverError::BadRequest(body),
            s if s.is_server_error() => DriverError::Server { status: s, body },
            s => DriverError::Status { status: s, body },
        }
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            return DriverError::Connection(e.to_string());
        }
        match e.status() {
            Some(status) => DriverError::from_status(status, e.to_string()),
            None => DriverError::Stream(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let classify = |code: u16| DriverError::from_status(StatusCode::from_u16(code).unwrap(), String::new());

        assert!(matches!(classify(401), DriverError::Authentication(_)));
        assert!(matches!(classify(429), DriverError::RateLimited(_)));
        assert!(matches!(classify(400), DriverError::BadRequest(_)));
        assert!(matches!(classify(500), DriverError::Server { .. }));
        assert!(matches!(classify(503), DriverError::Server { .. }));
        assert!(matches!(classify(404), DriverError::Status { .. }));
    }
}
