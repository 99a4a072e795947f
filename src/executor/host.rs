//! Native host script execution.
//!
//! Executes helper scripts directly on the host system using `tokio::process::Command`.

use super::{ExecutionCommand, ExecutionResult, ExecutorError, ShellExecutor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Executes helper scripts on the host system
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    scripts_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl HostExecutor {
    /// Create a host executor resolving scripts relative to the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve script identifiers inside `dir`.
    ///
    /// A relative `dir` is anchored to the current directory, since scripts run
    /// with `dir` as their working directory.
    pub fn with_scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.scripts_dir = Some(std::path::absolute(&dir).unwrap_or(dir));
        self
    }

    /// Bound every script run by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the command that runs `script` with the interpreter its extension asks for.
    pub fn script_command(&self, script: &str, args: &[String]) -> Result<ExecutionCommand, ExecutorError> {
        let path = match &self.scripts_dir {
            Some(dir) => {
                let path = dir.join(script);
                if !path.is_file() {
                    return Err(ExecutorError::ScriptNotFound(path.display().to_string()));
                }
                path
            }
            None => PathBuf::from(script),
        };
        let path_str = path.display().to_string();

        let mut command = match path.extension().and_then(|e| e.to_str()) {
            Some("sh") => {
                let mut cmd_args = vec![path_str];
                cmd_args.extend_from_slice(args);
                ExecutionCommand::new("sh", cmd_args)
            }
            Some("cmd") | Some("bat") => {
                let mut cmd_args = vec!["/C".to_string(), path_str];
                cmd_args.extend_from_slice(args);
                ExecutionCommand::new("cmd", cmd_args)
            }
            _ => ExecutionCommand::new(path_str, args.to_vec()),
        };

        if let Some(dir) = self.scripts_dir.as_deref().filter(|d| d.is_dir()) {
            command = command.with_working_dir(dir.to_path_buf());
        }
        if let Some(timeout) = self.timeout {
            command = command.with_timeout(timeout);
        }

        Ok(command)
    }

    /// Run an arbitrary command and capture its output
    pub async fn run(&self, cmd: ExecutionCommand) -> Result<ExecutionResult, ExecutorError> {
        debug!("Executing command on host: {} {:?}", cmd.program, cmd.args);

        let start = Instant::now();

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);

        if let Some(ref dir) = cmd.working_dir {
            command.current_dir(dir);
        }

        let output = if let Some(timeout) = cmd.timeout {
            match tokio::time::timeout(timeout, command.output()).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ExecutorError::Timeout(timeout));
                }
            }
        } else {
            command.output().await?
        };

        let duration = start.elapsed();

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration,
        })
    }
}

#[async_trait]
impl ShellExecutor for HostExecutor {
    async fn exec(&self, script: &str, args: &[String]) -> Result<ExecutionResult, ExecutorError> {
        let command = self.script_command(script, args)?;
        let result = self.run(command).await?;

        if !result.success() {
            return Err(ExecutorError::ExecutionFailed {
                script: script.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}
