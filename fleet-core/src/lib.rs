//! Core orchestration for running several ollama servers side by side.
//!
//! - [`Launcher`] resolves one instance's environment and `exec`s the server.
//! - [`Allocator`] lays N instances out over consecutive ports, one detached
//!   multiplexer session each, skipping sessions that already exist.
//! - [`Reaper`] kills every live session carrying the fleet prefix.
//!
//! Allocator and reaper only talk to the multiplexer through the
//! [`SessionRegistry`] trait, so they run unchanged against
//! [`InMemoryRegistry`] in tests.

pub mod allocator;
pub mod error;
pub mod launcher;
pub mod reaper;
pub mod session;

pub use allocator::{AllocationReport, Allocator, InstanceCount, LaunchCommand, Placement, PortRange};
pub use error::{ErrorKind, FleetError, FleetResult};
pub use launcher::{resolve_executable, Launcher};
pub use reaper::{ReapReport, Reaper};
pub use session::{InMemoryRegistry, SessionHandle, SessionId, SessionRegistry, TmuxRegistry};
