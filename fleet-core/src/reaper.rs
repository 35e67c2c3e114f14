//! Session teardown by prefix

use crate::error::FleetResult;
use crate::session::{SessionId, SessionRegistry};
use tracing::{error, info, warn};

/// What one teardown run found and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub matched: Vec<SessionId>,
    pub killed: Vec<SessionId>,
    pub failed: Vec<(SessionId, String)>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Kills every live session whose name starts with a literal prefix
pub struct Reaper<'a, R: SessionRegistry + ?Sized> {
    registry: &'a R,
    prefix: String,
}

impl<'a, R: SessionRegistry + ?Sized> Reaper<'a, R> {
    pub fn new(registry: &'a R, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
        }
    }

    /// Live sessions carrying the prefix.
    ///
    /// A failing list query (usually no multiplexer server) yields none.
    pub async fn matching_sessions(&self) -> Vec<SessionId> {
        match self.registry.list().await {
            Ok(sessions) => sessions
                .into_iter()
                .filter(|id| id.has_prefix(&self.prefix))
                .collect(),
            Err(e) => {
                warn!("Could not list sessions, assuming none: {}", e);
                Vec::new()
            }
        }
    }

    /// Kill each session in turn, continuing past failures
    pub async fn kill_all<F>(&self, sessions: &[SessionId], mut on_result: F) -> ReapReport
    where
        F: FnMut(&SessionId, &FleetResult<()>),
    {
        let mut report = ReapReport {
            matched: sessions.to_vec(),
            ..Default::default()
        };

        for id in sessions {
            let result = self.registry.kill(id).await;
            on_result(id, &result);
            match result {
                Ok(()) => {
                    info!("Killed session {}", id);
                    report.killed.push(id.clone());
                }
                Err(e) => {
                    error!("Failed to kill session {}: {}", id, e);
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        report
    }

    /// List, filter and kill in one go
    pub async fn reap(&self) -> ReapReport {
        let sessions = self.matching_sessions().await;
        if sessions.is_empty() {
            info!("No sessions with prefix '{}' found", self.prefix);
            return ReapReport::default();
        }
        self.kill_all(&sessions, |_, _| {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemoryRegistry;

    #[tokio::test]
    async fn test_unavailable_list_counts_as_empty() {
        let registry = InMemoryRegistry::with_sessions(["llm-11434"]);
        registry.set_list_unavailable(true);

        let report = Reaper::new(&registry, "llm-").reap().await;

        assert!(report.is_empty());
        assert_eq!(registry.kill_calls(), 0);
        assert_eq!(registry.names(), vec!["llm-11434"]);
    }
}
