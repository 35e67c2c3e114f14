//! tmux backend against a real tmux server on a private socket
//!
//! Skipped when tmux is not installed.

use fleet_core::*;
use std::process::Command;

/// Private tmux server, killed when dropped
struct Server {
    socket: String,
}

impl Server {
    fn start(test: &str) -> Option<Self> {
        let path = std::env::var_os("PATH");
        if resolve_executable("tmux", path.as_deref()).is_none() {
            eprintln!("tmux not installed, skipping {}", test);
            return None;
        }
        Some(Self {
            socket: format!("fleet-{}-{}", test, std::process::id()),
        })
    }

    fn registry(&self) -> TmuxRegistry {
        TmuxRegistry::new("tmux").with_socket(&self.socket)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = Command::new("tmux")
            .args(["-L", &self.socket, "kill-server"])
            .output();
    }
}

#[tokio::test]
async fn test_session_lifecycle_on_real_tmux() {
    let Some(server) = Server::start("lifecycle") else {
        return;
    };
    let registry = server.registry();
    let long = SessionId::new("llm-11434");
    let short = SessionId::new("llm-1");

    // No server is running on the fresh socket yet
    assert!(!registry.exists(&long).await.unwrap());
    assert!(matches!(
        registry.list().await,
        Err(FleetError::Multiplexer { .. })
    ));
    assert!(matches!(
        registry.kill(&long).await,
        Err(FleetError::SessionNotFound(_))
    ));

    let handle = registry.create(&long, "sleep 30").await.unwrap();
    assert_eq!(handle.id, long);

    // Exact targets: `llm-1` must not resolve to `llm-11434`
    assert!(registry.exists(&long).await.unwrap());
    assert!(!registry.exists(&short).await.unwrap());
    assert!(matches!(
        registry.kill(&short).await,
        Err(FleetError::SessionNotFound(_))
    ));
    assert!(registry.exists(&long).await.unwrap());

    assert!(matches!(
        registry.create(&long, "sleep 30").await,
        Err(FleetError::SessionExists(_))
    ));

    registry.create(&short, "sleep 30").await.unwrap();
    let mut names: Vec<String> = registry
        .list()
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    names.sort();
    assert_eq!(names, vec!["llm-1", "llm-11434"]);

    registry.kill(&long).await.unwrap();
    assert!(!registry.exists(&long).await.unwrap());
    assert!(registry.exists(&short).await.unwrap());
}

#[tokio::test]
async fn test_allocate_and_reap_on_real_tmux() {
    let Some(server) = Server::start("fleet") else {
        return;
    };
    let registry = server.registry();
    registry
        .create(&SessionId::new("llm-20001"), "sleep 30")
        .await
        .unwrap();
    registry
        .create(&SessionId::new("scratch"), "sleep 30")
        .await
        .unwrap();

    let command = LaunchCommand::new("sleep", "sleep 30");
    let allocator = Allocator::new(&registry, "llm-", 20000, command);
    let report = allocator
        .allocate(InstanceCount::parse("3").unwrap())
        .await
        .unwrap();

    let launched: Vec<u16> = report.launched().map(Placement::port).collect();
    assert_eq!(launched, vec![20000, 20002]);
    assert_eq!(report.skipped().count(), 1);

    let reaped = Reaper::new(&registry, "llm-").reap().await;
    assert_eq!(reaped.killed.len(), 3);
    assert!(reaped.failed.is_empty());

    let left: Vec<String> = registry
        .list()
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(left, vec!["scratch"]);
}
