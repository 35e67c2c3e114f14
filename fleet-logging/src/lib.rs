//! Logging infrastructure for the ollama fleet harness
//!
//! Two entry points:
//! - [`init_logging`] installs the process-wide subscriber used by every
//!   command. It writes to stderr so stdout stays free for operator output.
//! - [`JobLog`] builds a self-contained subscriber for one driver job that
//!   mirrors the job's events to the console and to its own log file.

pub mod init;
pub mod job;

pub use init::{init_logging, resolve_filter};
pub use job::{JobFormat, JobLog};
