//! # Host Shell Execution
//!
//! Runs the host-side helper scripts that create and remove the directories
//! backing container data volumes.
//!
//! ## Core Components
//!
//! - **[`ShellExecutor`]**: The seam the orchestrator depends on; runs a named script
//! - **[`HostExecutor`]**: Runs scripts on the host through `tokio::process::Command`
//! - **[`HostScripts`]**: Platform-resolved script identifiers
//! - **[`ExecutionCommand`]**: Program, arguments, working directory and timeout
//! - **[`ExecutionResult`]**: Execution outcome with stdout, stderr, exit code, and duration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sqlcontainers::executor::{HostExecutor, HostScripts, ShellExecutor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = HostExecutor::new().with_scripts_dir("/opt/sqlcontainers/scripts");
//!     let scripts = HostScripts::current();
//!
//!     let result = executor
//!         .exec(&scripts.create_volume, &["demo1".to_string()])
//!         .await?;
//!     println!("Volume folder: {}", result.stdout.trim());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Host-based script execution.
pub mod host;

/// Platform selection of the helper script names.
pub mod scripts;

pub use host::HostExecutor;
pub use scripts::{HostScripts, Platform};

/// Result of command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Exit code (0 = success, non-zero = failure)
    pub exit_code: i32,
    /// Duration of command execution
    pub duration: Duration,
}

impl ExecutionResult {
    /// Check if the command executed successfully (exit code 0)
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionCommand {
    /// Program name or path to execute
    pub program: String,
    /// Command line arguments
    pub args: Vec<String>,
    /// Working directory for command execution
    pub working_dir: Option<PathBuf>,
    /// Maximum execution time (None = no timeout)
    pub timeout: Option<Duration>,
}

impl ExecutionCommand {
    /// Create a new command with just program and args
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout: None,
        }
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Set execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Errors during script execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Script could not be located
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// Script ran but reported failure
    #[error("Script {script} exited with code {exit_code}: {stderr}")]
    ExecutionFailed {
        script: String,
        exit_code: i32,
        stderr: String,
    },

    /// Command execution timed out
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Runs host helper scripts by identifier.
///
/// The orchestrator only ever passes identifiers taken from [`HostScripts`];
/// mapping them to files and interpreters is the implementation's business.
#[async_trait]
pub trait ShellExecutor: Send + Sync {
    /// Run `script` with `args`, succeeding only on a zero exit status.
    async fn exec(&self, script: &str, args: &[String]) -> Result<ExecutionResult, ExecutorError>;
}
