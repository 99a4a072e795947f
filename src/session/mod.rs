//! # Interactive Sessions
//!
//! Readiness polling and the per-container interactive `sqlcmd` session.
//!
//! - **[`SessionPoller`]**: bounded, cancellable retry loop around a readiness check
//! - **[`CliSessionManager`]**: `Closed → Opening → {Ready, Unavailable} → Closed`
//!   state machine per container, driven by the administration service

use crate::error::RequestError;

pub mod cli;
pub mod poller;

pub use cli::{CliSessionManager, SessionInfo, SessionState};
pub use poller::{PollConfig, PollHandle, PollOutcome, SessionPoller};

/// Session command failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A session is already open for container {0}")]
    AlreadyOpen(String),

    #[error("Container {0} is not running")]
    ContainerNotRunning(String),

    #[error("Container {0} not found")]
    ContainerNotFound(String),

    /// The administration service refused to launch the terminal
    #[error("Failed to start session: {0}")]
    StartFailed(#[source] RequestError),

    #[error("Failed to stop session: {0}")]
    StopFailed(#[source] RequestError),
}
