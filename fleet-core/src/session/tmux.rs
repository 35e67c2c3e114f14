//! tmux-backed session registry

use super::{SessionHandle, SessionId, SessionRegistry};
use crate::error::{FleetError, FleetResult};
use async_trait::async_trait;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Talks to a tmux server through the `tmux` command line
#[derive(Debug, Clone)]
pub struct TmuxRegistry {
    binary: String,
    socket: Option<String>,
}

impl TmuxRegistry {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            socket: None,
        }
    }

    /// Use the tmux server behind a named socket (`tmux -L <name>`)
    pub fn with_socket(mut self, name: impl Into<String>) -> Self {
        self.socket = Some(name.into());
        self
    }

    /// Full argument list, socket selection first
    fn command_args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(socket) = &self.socket {
            full.extend(["-L", socket.as_str()]);
        }
        full.extend_from_slice(args);
        full
    }

    /// Exact-match target; a bare name would let tmux match by prefix
    fn target(id: &SessionId) -> String {
        format!("={}", id)
    }

    async fn run(&self, args: &[&str]) -> FleetResult<Output> {
        let args = self.command_args(args);
        debug!("Running {} {}", self.binary, args.join(" "));

        Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FleetError::MissingExecutable {
                    name: self.binary.clone(),
                },
                _ => FleetError::Spawn {
                    program: self.binary.clone(),
                    source: e,
                },
            })
    }

    fn failure(&self, args: &[&str], output: &Output) -> FleetError {
        FleetError::Multiplexer {
            command: format!("{} {}", self.binary, self.command_args(args).join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

#[async_trait]
impl SessionRegistry for TmuxRegistry {
    async fn exists(&self, id: &SessionId) -> FleetResult<bool> {
        let target = Self::target(id);
        // Non-zero covers both "no such session" and "no server running"
        let output = self.run(&["has-session", "-t", target.as_str()]).await?;
        Ok(output.status.success())
    }

    async fn create(&self, id: &SessionId, command: &str) -> FleetResult<SessionHandle> {
        let args = ["new-session", "-d", "-s", id.as_str(), command];
        let output = self.run(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("duplicate session") {
                return Err(FleetError::SessionExists(id.to_string()));
            }
            return Err(self.failure(&args, &output));
        }

        Ok(SessionHandle {
            id: id.clone(),
            command: command.to_string(),
        })
    }

    async fn kill(&self, id: &SessionId) -> FleetResult<()> {
        let target = Self::target(id);
        let args = ["kill-session", "-t", target.as_str()];
        let output = self.run(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("can't find session") || stderr.contains("no server running") {
                return Err(FleetError::SessionNotFound(id.to_string()));
            }
            return Err(self.failure(&args, &output));
        }

        Ok(())
    }

    async fn list(&self) -> FleetResult<Vec<SessionId>> {
        let args = ["list-sessions", "-F", "#{session_name}"];
        let output = self.run(&args).await?;

        if !output.status.success() {
            return Err(self.failure(&args, &output));
        }

        Ok(parse_session_names(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// One session name per line, blank lines ignored
fn parse_session_names(stdout: &str) -> Vec<SessionId> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(SessionId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_names() {
        let names = parse_session_names("llm-11434\nllm-11435\n\nscratch\n");
        let names: Vec<&str> = names.iter().map(SessionId::as_str).collect();
        assert_eq!(names, vec!["llm-11434", "llm-11435", "scratch"]);
    }

    #[test]
    fn test_target_is_exact_match() {
        assert_eq!(TmuxRegistry::target(&SessionId::new("llm-11434")), "=llm-11434");
    }

    #[test]
    fn test_socket_goes_before_the_subcommand() {
        let registry = TmuxRegistry::new("tmux");
        assert_eq!(registry.command_args(&["list-sessions"]), vec!["list-sessions"]);

        let registry = registry.with_socket("fleet");
        assert_eq!(
            registry.command_args(&["kill-session", "-t", "=llm-1"]),
            vec!["-L", "fleet", "kill-session", "-t", "=llm-1"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_environment_error() {
        let registry = TmuxRegistry::new("definitely-not-a-multiplexer-binary");
        let err = registry.list().await.unwrap_err();
        assert!(matches!(err, FleetError::MissingExecutable { .. }));
    }
}
