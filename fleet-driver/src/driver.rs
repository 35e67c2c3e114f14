//! Concurrent job runner
//!
//! Job `i` is named `P{i:02}`, targets `base_port + i` (or `base_port` in
//! single-port mode) and runs as its own tokio task under its own log
//! subscriber.

use crate::chat::{ChatClient, ChatRequest};
use crate::error::{DriverError, DriverResult};
use crate::prompts::Prompts;
use fleet_config::DriverConfig;
use fleet_logging::JobLog;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

/// Everything one job needs, owned so it can move into a task
#[derive(Debug, Clone, Serialize)]
pub struct JobSettings {
    pub id: usize,
    pub name: String,
    pub port: u16,
    pub endpoint: String,
    pub model: String,
    pub multiport: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub enable_thinking: bool,
    pub log_folder: PathBuf,
    pub prompts: Prompts,
}

impl JobSettings {
    pub fn request(&self) -> ChatRequest {
        ChatRequest::streaming(
            &self.model,
            &self.prompts.system,
            &self.prompts.user,
            self.temperature,
            self.top_p,
            self.enable_thinking,
        )
    }
}

/// How one job ended
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub port: u16,
    pub result: DriverResult<String>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fires concurrent streaming jobs against one or more instances
pub struct Driver {
    config: DriverConfig,
    base_port: u16,
    prompts: Prompts,
    http: Client,
}

impl Driver {
    /// Validate the configuration and read the prompts
    pub fn new(config: DriverConfig, base_port: u16) -> DriverResult<Self> {
        use fleet_config::validation::Validatable;
        config.validate()?;
        let prompts = Prompts::load(&config)?;
        Ok(Self::with_prompts(config, base_port, prompts))
    }

    pub fn with_prompts(config: DriverConfig, base_port: u16, prompts: Prompts) -> Self {
        // No request timeout: jobs are expected to run for a long time
        Self {
            config,
            base_port,
            prompts,
            http: Client::new(),
        }
    }

    /// Port targeted by job `index`
    pub fn port_for(&self, index: usize) -> DriverResult<u16> {
        if !self.config.multiport {
            return Ok(self.base_port);
        }
        u16::try_from(index)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or_else(|| {
                DriverError::Config(fleet_config::ConfigError::DomainError {
                    domain: "driver".to_string(),
                    message: format!("job {} would target a port above 65535", index),
                })
            })
    }

    pub fn job_name(index: usize) -> String {
        format!("P{:02}", index)
    }

    /// Settings for job `index`
    pub fn job(&self, index: usize) -> DriverResult<JobSettings> {
        let port = self.port_for(index)?;
        Ok(JobSettings {
            id: index,
            name: Self::job_name(index),
            port,
            endpoint: self.config.endpoint_for(port),
            model: self.config.model.clone(),
            multiport: self.config.multiport,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            enable_thinking: self.config.enable_thinking,
            log_folder: self.config.log_folder.clone(),
            prompts: self.prompts.clone(),
        })
    }

    /// Run `jobs` jobs concurrently and wait for all of them.
    ///
    /// Fails only when the jobs could not be set up; per-job failures are
    /// logged and reported in the outcomes.
    pub async fn run(&self, jobs: usize) -> DriverResult<Vec<JobOutcome>> {
        let settings = (0..jobs)
            .map(|index| self.job(index))
            .collect::<DriverResult<Vec<_>>>()?;

        std::fs::create_dir_all(&self.config.log_folder).map_err(|e| {
            DriverError::Logging(format!(
                "failed to create log folder {:?}: {}",
                self.config.log_folder, e
            ))
        })?;

        info!("Starting {} job(s)", jobs);

        let mut handles = Vec::with_capacity(settings.len());
        for job in settings {
            let log = JobLog::create(&job.name, &job.log_folder)
                .map_err(|e| DriverError::Logging(format!("{:#}", e)))?;
            let client = ChatClient::new(
                self.http.clone(),
                job.endpoint.clone(),
                self.config.api_key.clone(),
            );
            let name = job.name.clone();
            let port = job.port;

            let task = run_job(client, job).with_subscriber(log.dispatch());
            handles.push((name, port, tokio::spawn(task)));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, port, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Job {} panicked: {}", name, e);
                    Err(DriverError::Task(e.to_string()))
                }
            };
            outcomes.push(JobOutcome { name, port, result });
        }

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        info!(
            "All jobs finished: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );

        Ok(outcomes)
    }
}

/// Body of one job; expects to run under the job's own subscriber
pub async fn run_job(client: ChatClient, job: JobSettings) -> DriverResult<String> {
    info!("Created logger");
    info!("Job ID: {}", job.id);
    match serde_json::to_string_pretty(&job) {
        Ok(json) => info!("Config:\n{}", json),
        Err(e) => error!("Could not render job config: {}", e),
    }
    info!("Created client for {}", client.completions_url());

    let request = job.request();
    let result = client
        .stream(&request, |delta| info!("{}", delta))
        .await;

    match &result {
        Ok(output) => {
            info!("LLM response:\n{}", output);
            info!("Finished successfully.");
        }
        Err(e) => error!("{}", e),
    }
    info!("Exiting");

    result
}
