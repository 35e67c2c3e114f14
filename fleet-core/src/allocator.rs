//! Multi-instance allocator
//!
//! Instance `i` of a run listens on `base_port + i` inside session
//! `prefix ++ (base_port + i)`. Sessions that already exist are skipped with
//! a warning; nothing is retried and no alternate port is tried.

use crate::error::{FleetError, FleetResult};
use crate::session::{SessionHandle, SessionId, SessionRegistry};
use fleet_config::InstanceConfig;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Validated number of instances to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceCount(u16);

impl InstanceCount {
    /// Parse a user-supplied count; only positive integers are accepted
    pub fn parse(raw: &str) -> FleetResult<Self> {
        let trimmed = raw.trim();
        let value: i64 = trimmed.parse().map_err(|_| {
            FleetError::usage(format!(
                "instance count must be a positive integer, got '{}'",
                raw
            ))
        })?;

        if value <= 0 {
            return Err(FleetError::usage(format!(
                "instance count must be a positive integer, got {}",
                value
            )));
        }

        u16::try_from(value)
            .map(Self)
            .map_err(|_| FleetError::usage(format!("instance count {} exceeds the port space", value)))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

/// Contiguous ports `[base, base + count - 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    base: u16,
    count: u16,
}

impl PortRange {
    pub fn new(base: u16, count: InstanceCount) -> FleetResult<Self> {
        let last = u32::from(base) + u32::from(count.get()) - 1;
        if base == 0 || last > u32::from(u16::MAX) {
            return Err(FleetError::usage(format!(
                "{} instances starting at port {} do not fit below port {}",
                count.get(),
                base,
                u16::MAX
            )));
        }
        Ok(Self {
            base,
            count: count.get(),
        })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn last(&self) -> u16 {
        self.base + (self.count - 1)
    }

    pub fn len(&self) -> usize {
        usize::from(self.count)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Ports in increasing index order
    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.base..=self.last()
    }
}

/// Renders the command each session runs: the launcher, then a shell
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    program: PathBuf,
    leading_args: Vec<String>,
    launch_args: Vec<String>,
    fallback_shell: String,
}

impl LaunchCommand {
    /// `program` is invoked as `program <leading_args> launch [settings] --port=<port>`
    pub fn new(program: impl Into<PathBuf>, fallback_shell: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            launch_args: Vec::new(),
            fallback_shell: fallback_shell.into(),
        }
    }

    /// Global arguments placed before the `launch` subcommand
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pin every server setting except the port as `launch` flags.
    ///
    /// A session starts under the multiplexer server's environment, not the
    /// caller's, so `OLLAMA_*` values resolved here would otherwise be lost.
    pub fn with_instance(mut self, instance: &InstanceConfig) -> Self {
        self.launch_args = vec![
            format!("--host={}", instance.host),
            format!("--models={}", instance.model_directory.to_string_lossy()),
            format!("--keep-alive={}", instance.keep_alive),
            format!("--parallel={}", instance.num_parallel),
            format!("--max-loaded={}", instance.max_loaded_models),
            toggle_flag("flash-attention", instance.flash_attention),
            toggle_flag("debug", instance.debug),
        ];
        self
    }

    /// Arguments after the program for the instance on `port`, unquoted
    pub fn args(&self, port: u16) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push("launch".to_string());
        args.extend(self.launch_args.iter().cloned());
        args.push(format!("--port={}", port));
        args
    }

    /// Shell command line for the instance on `port`
    pub fn render(&self, port: u16) -> String {
        let mut parts = vec![shell_quote(&self.program.to_string_lossy())];
        parts.extend(self.args(port).iter().map(|arg| shell_quote(arg)));

        format!("{}; {}", parts.join(" "), self.fallback_shell)
    }
}

fn toggle_flag(name: &str, on: bool) -> String {
    if on {
        format!("--{}", name)
    } else {
        format!("--no-{}", name)
    }
}

/// Quote for POSIX `sh` unless the word is obviously safe
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// What happened to one index of an allocation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A new session was created
    Launched { port: u16, handle: SessionHandle },
    /// The session name was already live
    Skipped { port: u16, session: SessionId },
    /// The multiplexer refused or failed
    Failed {
        port: u16,
        session: SessionId,
        reason: String,
    },
}

impl Placement {
    pub fn port(&self) -> u16 {
        match self {
            Placement::Launched { port, .. }
            | Placement::Skipped { port, .. }
            | Placement::Failed { port, .. } => *port,
        }
    }

    pub fn session(&self) -> &SessionId {
        match self {
            Placement::Launched { handle, .. } => &handle.id,
            Placement::Skipped { session, .. } | Placement::Failed { session, .. } => session,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Launched { port, handle } => {
                write!(f, "started session {} on port {}", handle.id, port)
            }
            Placement::Skipped { port, session } => {
                write!(f, "session {} already exists, skipping port {}", session, port)
            }
            Placement::Failed {
                port,
                session,
                reason,
            } => write!(f, "failed to start session {} on port {}: {}", session, port, reason),
        }
    }
}

/// Outcome of one allocation run, in index order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    pub placements: Vec<Placement>,
}

impl AllocationReport {
    pub fn launched(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Launched { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Skipped { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Failed { .. }))
    }
}

/// Lays instances out over consecutive ports, one session each
pub struct Allocator<'a, R: SessionRegistry + ?Sized> {
    registry: &'a R,
    prefix: String,
    base_port: u16,
    command: LaunchCommand,
}

impl<'a, R: SessionRegistry + ?Sized> Allocator<'a, R> {
    pub fn new(
        registry: &'a R,
        prefix: impl Into<String>,
        base_port: u16,
        command: LaunchCommand,
    ) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
            base_port,
            command,
        }
    }

    /// Port range for `count` instances; fails before any session is touched
    pub fn plan(&self, count: InstanceCount) -> FleetResult<PortRange> {
        PortRange::new(self.base_port, count)
    }

    /// Start `count` instances, collecting every placement
    pub async fn allocate(&self, count: InstanceCount) -> FleetResult<AllocationReport> {
        self.allocate_with(count, |_, _| {}).await
    }

    /// Start `count` instances, calling `on_placement(index, placement)` as
    /// each index is settled
    pub async fn allocate_with<F>(
        &self,
        count: InstanceCount,
        mut on_placement: F,
    ) -> FleetResult<AllocationReport>
    where
        F: FnMut(usize, &Placement),
    {
        let range = self.plan(count)?;
        info!(
            "Allocating {} instance(s) on ports {}-{}",
            range.len(),
            range.base(),
            range.last()
        );

        let mut report = AllocationReport::default();
        for (index, port) in range.ports().enumerate() {
            let placement = self.place(port).await;
            on_placement(index, &placement);
            report.placements.push(placement);
        }

        Ok(report)
    }

    /// Settle a single port: check, then create
    pub async fn place(&self, port: u16) -> Placement {
        let session = SessionId::for_port(&self.prefix, port);

        match self.registry.exists(&session).await {
            Ok(true) => {
                warn!("Session {} already exists, skipping", session);
                return Placement::Skipped { port, session };
            }
            Ok(false) => {}
            Err(e) => {
                error!("Could not check session {}: {}", session, e);
                return Placement::Failed {
                    port,
                    session,
                    reason: e.to_string(),
                };
            }
        }

        let command = self.command.render(port);
        match self.registry.create(&session, &command).await {
            Ok(handle) => {
                info!("Started session {} on port {}", handle.id, port);
                Placement::Launched { port, handle }
            }
            // Lost the race against another run between check and create
            Err(FleetError::SessionExists(_)) => {
                warn!("Session {} already exists, skipping", session);
                Placement::Skipped { port, session }
            }
            Err(e) => {
                error!("Failed to start session {}: {}", session, e);
                Placement::Failed {
                    port,
                    session,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_count_parse() {
        assert_eq!(InstanceCount::parse("3").unwrap().get(), 3);
        assert_eq!(InstanceCount::parse(" 12 ").unwrap().get(), 12);

        for bad in ["0", "-2", "abc", "", "1.5", "70000"] {
            let err = InstanceCount::parse(bad).unwrap_err();
            assert!(matches!(err, FleetError::Usage(_)), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_port_range() {
        let range = PortRange::new(11434, InstanceCount::parse("3").unwrap()).unwrap();
        assert_eq!(range.ports().collect::<Vec<_>>(), vec![11434, 11435, 11436]);
        assert_eq!(range.last(), 11436);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_port_range_overflow_is_usage_error() {
        let count = InstanceCount::parse("3").unwrap();
        assert!(PortRange::new(65534, count).is_err());
        assert!(PortRange::new(65533, count).is_ok());
    }

    #[test]
    fn test_launch_command_render() {
        let command = LaunchCommand::new("/opt/fleet/bin/fleet", "bash");
        assert_eq!(
            command.render(11434),
            "/opt/fleet/bin/fleet launch --port=11434; bash"
        );

        let command = LaunchCommand::new("/home/me/my tools/fleet", "zsh")
            .with_args(["--config", "/etc/fleet.yaml"]);
        assert_eq!(
            command.render(11500),
            "'/home/me/my tools/fleet' --config /etc/fleet.yaml launch --port=11500; zsh"
        );
    }

    #[test]
    fn test_launch_command_pins_instance_settings() {
        let instance = InstanceConfig {
            host: "0.0.0.0".to_string(),
            model_directory: PathBuf::from("/srv/my models"),
            keep_alive: "-1".to_string(),
            num_parallel: 4,
            max_loaded_models: 2,
            flash_attention: true,
            ..Default::default()
        };
        let command = LaunchCommand::new("/usr/bin/fleet", "bash").with_instance(&instance);

        assert_eq!(
            command.render(11435),
            "/usr/bin/fleet launch --host=0.0.0.0 '--models=/srv/my models' --keep-alive=-1 \
             --parallel=4 --max-loaded=2 --flash-attention --no-debug --port=11435; bash"
        );
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
