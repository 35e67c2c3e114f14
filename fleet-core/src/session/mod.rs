//! Multiplexer session registry abstraction

use crate::error::FleetResult;
use async_trait::async_trait;
use std::fmt;

pub mod memory;
pub mod tmux;

pub use memory::InMemoryRegistry;
pub use tmux::TmuxRegistry;

/// Name of one multiplexer session: `prefix ++ decimal(port)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Session name for the instance listening on `port`
    pub fn for_port(prefix: &str, port: u16) -> Self {
        Self(format!("{}{}", prefix, port))
    }

    /// Wrap a name reported by the multiplexer
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Literal prefix test, no globbing
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A detached session that was created for an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub command: String,
}

/// Live session registry owned by the terminal multiplexer.
///
/// Implementations must not cache: every call reflects current state.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Whether a session with exactly this name is live
    async fn exists(&self, id: &SessionId) -> FleetResult<bool>;

    /// Start a detached session running `command`
    async fn create(&self, id: &SessionId, command: &str) -> FleetResult<SessionHandle>;

    /// Terminate a session
    async fn kill(&self, id: &SessionId) -> FleetResult<()>;

    /// Names of all live sessions
    async fn list(&self) -> FleetResult<Vec<SessionId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_plain_concatenation() {
        let id = SessionId::for_port("llm-", 11434);
        assert_eq!(id.as_str(), "llm-11434");
        assert_eq!(SessionId::for_port("x", 80).to_string(), "x80");
    }

    #[test]
    fn test_prefix_is_literal() {
        assert!(SessionId::new("llm-11434").has_prefix("llm-"));
        assert!(!SessionId::new("other-llm-11434").has_prefix("llm-"));
        assert!(!SessionId::new("llm11434").has_prefix("llm-"));
        assert!(!SessionId::new("llm-11434").has_prefix("llm-*"));
    }
}
