//! Single-instance launcher
//!
//! Turns a resolved [`InstanceConfig`] into the environment of an
//! `ollama serve` process and hands the current process over to it.

use crate::error::{FleetError, FleetResult};
use fleet_config::InstanceConfig;
use std::convert::Infallible;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Find `name` the way a shell would.
///
/// Names containing a path separator are checked as given; bare names are
/// searched in every directory of `search_path`.
pub fn resolve_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(name);
        return is_executable(&candidate).then_some(candidate);
    }

    let search_path = search_path?;
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Starts one inference server with a fixed configuration
#[derive(Debug, Clone)]
pub struct Launcher {
    config: InstanceConfig,
}

impl Launcher {
    pub fn new(config: InstanceConfig) -> Self {
        Self { config }
    }

    /// Environment handed to the server process
    pub fn server_env(&self) -> Vec<(&'static str, String)> {
        let toggle = |on: bool| String::from(if on { "1" } else { "0" });

        vec![
            ("OLLAMA_HOST", self.config.address()),
            (
                "OLLAMA_MODELS",
                self.config.model_directory.to_string_lossy().into_owned(),
            ),
            ("OLLAMA_KEEP_ALIVE", self.config.keep_alive.clone()),
            ("OLLAMA_NUM_PARALLEL", self.config.num_parallel.to_string()),
            (
                "OLLAMA_MAX_LOADED_MODELS",
                self.config.max_loaded_models.to_string(),
            ),
            ("OLLAMA_FLASH_ATTENTION", toggle(self.config.flash_attention)),
            ("OLLAMA_DEBUG", toggle(self.config.debug)),
        ]
    }

    /// Human-readable summary printed before the server starts
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Host", self.config.host.clone()),
            ("Port", self.config.port.to_string()),
            (
                "Models",
                self.config.model_directory.display().to_string(),
            ),
            ("Keep alive", self.config.keep_alive.clone()),
            ("Parallel", self.config.num_parallel.to_string()),
            ("Max loaded", self.config.max_loaded_models.to_string()),
            ("Flash attention", self.config.flash_attention.to_string()),
            ("Debug", self.config.debug.to_string()),
        ]
    }

    /// Locate the server binary on the current `PATH`
    pub fn resolve_server(&self) -> FleetResult<PathBuf> {
        let path = std::env::var_os("PATH");
        resolve_executable(&self.config.server_binary, path.as_deref()).ok_or_else(|| {
            FleetError::MissingExecutable {
                name: self.config.server_binary.clone(),
            }
        })
    }

    /// Resolve the binary, then make sure the model directory exists.
    ///
    /// Nothing on disk is touched when the binary is missing.
    pub fn prepare(&self) -> FleetResult<PathBuf> {
        let server = self.resolve_server()?;
        debug!("Resolved server binary: {:?}", server);

        let models = &self.config.model_directory;
        std::fs::create_dir_all(models).map_err(|source| FleetError::ModelDirectory {
            path: models.clone(),
            source,
        })?;

        Ok(server)
    }

    /// `ollama serve` with the instance environment applied
    pub fn server_command(&self, server: &Path) -> Command {
        let mut command = Command::new(server);
        command.arg("serve");
        for (key, value) in self.server_env() {
            command.env(key, value);
        }
        command
    }

    /// Replace the current process with the server.
    ///
    /// Only returns if the hand-over itself failed.
    pub fn run_foreground(&self) -> FleetResult<Infallible> {
        let server = self.prepare()?;
        let mut command = self.server_command(&server);

        info!(
            "Starting {} on {}",
            self.config.server_binary,
            self.config.address()
        );

        exec(&mut command, &self.config.server_binary)
    }
}

#[cfg(unix)]
fn exec(command: &mut Command, program: &str) -> FleetResult<Infallible> {
    use std::os::unix::process::CommandExt;

    let source = command.exec();
    Err(FleetError::Spawn {
        program: program.to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn exec(command: &mut Command, program: &str) -> FleetResult<Infallible> {
    let status = command.status().map_err(|source| FleetError::Spawn {
        program: program.to_string(),
        source,
    })?;
    std::process::exit(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn launcher_in(dir: &Path, binary: &str) -> Launcher {
        Launcher::new(InstanceConfig {
            port: 11435,
            model_directory: dir.join("models"),
            server_binary: binary.to_string(),
            num_parallel: 4,
            flash_attention: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_server_env() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher_in(dir.path(), "ollama");
        let env: HashMap<_, _> = launcher.server_env().into_iter().collect();

        assert_eq!(env["OLLAMA_HOST"], "127.0.0.1:11435");
        assert_eq!(env["OLLAMA_NUM_PARALLEL"], "4");
        assert_eq!(env["OLLAMA_MAX_LOADED_MODELS"], "1");
        assert_eq!(env["OLLAMA_FLASH_ATTENTION"], "1");
        assert_eq!(env["OLLAMA_DEBUG"], "0");
        assert_eq!(env["OLLAMA_KEEP_ALIVE"], "5m");
    }

    #[test]
    fn test_server_command_passes_config_through_env() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher_in(dir.path(), "ollama");
        let command = launcher.server_command(Path::new("/usr/bin/ollama"));

        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec![OsStr::new("serve")]);
        assert!(command
            .get_envs()
            .any(|(k, v)| k == OsStr::new("OLLAMA_HOST") && v == Some(OsStr::new("127.0.0.1:11435"))));
    }

    #[test]
    fn test_missing_binary_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher_in(dir.path(), "definitely-not-an-inference-server");

        let err = launcher.prepare().unwrap_err();
        assert!(matches!(err, FleetError::MissingExecutable { .. }));
        assert!(!dir.path().join("models").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_creates_model_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("fake-server");
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let launcher = launcher_in(dir.path(), binary.to_str().unwrap());
        let resolved = launcher.prepare().unwrap();

        assert_eq!(resolved, binary);
        assert!(dir.path().join("models").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_executable_searches_path() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let plain = first.path().join("tool");
        std::fs::write(&plain, "not executable").unwrap();
        let runnable = second.path().join("tool");
        std::fs::write(&runnable, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&runnable, std::fs::Permissions::from_mode(0o755)).unwrap();

        let search = std::env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(resolve_executable("tool", Some(&search)), Some(runnable));
        assert_eq!(resolve_executable("missing", Some(&search)), None);
        assert_eq!(resolve_executable("tool", None), None);
    }
}
