//! In-process session registry for exercising allocation and teardown

use super::{SessionHandle, SessionId, SessionRegistry};
use crate::error::{FleetError, FleetResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Registry keeping sessions in memory and counting every call
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    sessions: BTreeMap<SessionId, String>,
    exists_calls: usize,
    create_calls: usize,
    kill_calls: usize,
    list_unavailable: bool,
    refused: BTreeMap<SessionId, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with sessions running an unknown command
    pub fn with_sessions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        {
            let mut state = registry.lock();
            for name in names {
                state.sessions.insert(SessionId::new(name), String::new());
            }
        }
        registry
    }

    /// Make `list` fail as if no multiplexer server were running
    pub fn set_list_unavailable(&self, unavailable: bool) {
        self.lock().list_unavailable = unavailable;
    }

    /// Make `create` and `kill` fail for one session name
    pub fn refuse(&self, name: impl Into<String>, reason: impl Into<String>) {
        self.lock()
            .refused
            .insert(SessionId::new(name), reason.into());
    }

    /// Names of live sessions in sorted order
    pub fn names(&self) -> Vec<String> {
        self.lock()
            .sessions
            .keys()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    /// Command a session was created with
    pub fn command_of(&self, name: &str) -> Option<String> {
        self.lock().sessions.get(&SessionId::new(name)).cloned()
    }

    pub fn exists_calls(&self) -> usize {
        self.lock().exists_calls
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn kill_calls(&self) -> usize {
        self.lock().kill_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the registry from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionRegistry for InMemoryRegistry {
    async fn exists(&self, id: &SessionId) -> FleetResult<bool> {
        let mut state = self.lock();
        state.exists_calls += 1;
        Ok(state.sessions.contains_key(id))
    }

    async fn create(&self, id: &SessionId, command: &str) -> FleetResult<SessionHandle> {
        let mut state = self.lock();
        state.create_calls += 1;
        if let Some(reason) = state.refused.get(id) {
            return Err(FleetError::Multiplexer {
                command: format!("new-session -s {}", id),
                stderr: reason.clone(),
            });
        }
        if state.sessions.contains_key(id) {
            return Err(FleetError::SessionExists(id.to_string()));
        }
        state.sessions.insert(id.clone(), command.to_string());
        Ok(SessionHandle {
            id: id.clone(),
            command: command.to_string(),
        })
    }

    async fn kill(&self, id: &SessionId) -> FleetResult<()> {
        let mut state = self.lock();
        state.kill_calls += 1;
        if let Some(reason) = state.refused.get(id) {
            return Err(FleetError::Multiplexer {
                command: format!("kill-session -t ={}", id),
                stderr: reason.clone(),
            });
        }
        match state.sessions.remove(id) {
            Some(_) => Ok(()),
            None => Err(FleetError::SessionNotFound(id.to_string())),
        }
    }

    async fn list(&self) -> FleetResult<Vec<SessionId>> {
        let state = self.lock();
        if state.list_unavailable {
            return Err(FleetError::Multiplexer {
                command: "list-sessions".to_string(),
                stderr: "no server running".to_string(),
            });
        }
        Ok(state.sessions.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let registry = InMemoryRegistry::new();
        let id = SessionId::new("llm-11434");

        registry.create(&id, "serve").await.unwrap();
        let err = registry.create(&id, "serve").await.unwrap_err();

        assert!(matches!(err, FleetError::SessionExists(_)));
        assert_eq!(registry.create_calls(), 2);
        assert_eq!(registry.command_of("llm-11434").as_deref(), Some("serve"));
    }

    #[tokio::test]
    async fn test_kill_missing_session() {
        let registry = InMemoryRegistry::with_sessions(["a"]);
        assert!(registry.kill(&SessionId::new("a")).await.is_ok());
        assert!(matches!(
            registry.kill(&SessionId::new("a")).await,
            Err(FleetError::SessionNotFound(_))
        ));
    }
}
