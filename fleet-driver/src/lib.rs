//! Load driver for ollama fleets
//!
//! Fires N concurrent OpenAI-compatible streaming chat completions, each
//! against its own instance (`base_port + i`) or all against the base port,
//! and logs every job to its own file.

pub mod chat;
pub mod driver;
pub mod error;
pub mod prompts;

pub use chat::{ChatClient, ChatMessage, ChatRequest};
pub use driver::{run_job, Driver, JobOutcome, JobSettings};
pub use error::{DriverError, DriverResult};
pub use prompts::Prompts;
