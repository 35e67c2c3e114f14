//! Per-job log sinks for the load driver.
//!
//! Every job gets its own [`Dispatch`] writing `<timestamp> | LEVEL | - [Pnn] msg`
//! lines to stderr (debug and above) and to `<folder>/<name>.log` (info and
//! above). The dispatch is attached to the job's future, so concurrent jobs
//! never interleave into each other's files.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{Dispatch, Event, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Line format tagging each event with the job name
#[derive(Debug, Clone)]
pub struct JobFormat {
    name: String,
}

impl JobFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<S, N> FormatEvent<S, N> for JobFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        let level = event.metadata().level().to_string();
        write!(writer, "{} | {:8.8} | - [{}] ", timestamp, level, self.name)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Subscriber and log file location for one job
pub struct JobLog {
    dispatch: Dispatch,
    path: PathBuf,
}

impl JobLog {
    /// Create `<folder>/<name>.log` and a subscriber feeding it
    pub fn create(name: &str, folder: &Path) -> Result<Self> {
        std::fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create log folder {:?}", folder))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(name)
            .filename_suffix("log")
            .build(folder)
            .with_context(|| format!("Failed to open log file for job {}", name))?;

        let console = tracing_subscriber::fmt::layer()
            .event_format(JobFormat::new(name))
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::DEBUG);

        let file = tracing_subscriber::fmt::layer()
            .event_format(JobFormat::new(name))
            .with_ansi(false)
            .with_writer(appender)
            .with_filter(LevelFilter::INFO);

        let subscriber = tracing_subscriber::registry().with(console).with(file);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            path: folder.join(format!("{}.log", name)),
        })
    }

    /// Dispatch to attach with `WithSubscriber::with_subscriber`
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_log_writes_info_but_not_debug() {
        let dir = tempfile::tempdir().unwrap();
        let log = JobLog::create("P03", dir.path()).unwrap();

        tracing::dispatcher::with_default(&log.dispatch(), || {
            tracing::debug!("token delta");
            tracing::info!("Created logger");
        });

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("| INFO     | - [P03] Created logger"));
        assert!(!content.contains("token delta"));
    }
}
