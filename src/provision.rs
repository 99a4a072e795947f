//! Container creation workflow.
//!
//! Creation is two strictly ordered steps, never retried:
//!
//! 1. The host `createVolumeFolder` script makes a data directory for the
//!    container and prints its path. The path becomes the config's
//!    `volumePath`, its last segment the `volumeName`.
//! 2. The engine creates and starts the container with the completed config.
//!
//! A failed step 2 leaves the step 1 directory in place.

use crate::engine::ContainerEngine;
use crate::error::RequestError;
use crate::executor::{HostScripts, ShellExecutor};
use crate::model::{ContainerConfig, CreatedContainer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ways a creation attempt fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreationError {
    /// Required operator fields are blank
    #[error("Missing container settings: {}", .0.join(", "))]
    InvalidConfig(Vec<&'static str>),

    /// The host script failed or printed no path; the engine was not called
    #[error("Volume provisioning failed: {0}")]
    VolumeProvisioningFailed(String),

    /// The engine answered with a structured error
    #[error("{name}: {message}")]
    EngineRejected {
        status_code: u16,
        name: String,
        message: String,
    },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl CreationError {
    /// HTTP-style status an operator surface would report.
    pub fn status_code(&self) -> u16 {
        match self {
            CreationError::InvalidConfig(_) => 400,
            CreationError::EngineRejected { status_code, .. } => *status_code,
            CreationError::VolumeProvisioningFailed(_) | CreationError::Unknown { .. } => 500,
        }
    }
}

impl From<RequestError> for CreationError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Service(e) => CreationError::EngineRejected {
                status_code: e.status_code,
                name: e.name,
                message: e.message,
            },
            RequestError::Unknown(message) => CreationError::Unknown { message },
        }
    }
}

/// Split script output into `(volume_path, volume_name)`.
///
/// Backslashes become forward slashes so Windows paths resolve the same way.
pub fn resolve_volume(stdout: &str) -> Option<(String, String)> {
    let path = stdout.replace('\\', "/");
    let path = path.trim().trim_end_matches('/');
    let name = path.rsplit('/').next().filter(|name| !name.is_empty())?;
    Some((path.to_string(), name.to_string()))
}

/// Runs the creation workflow against the host and the engine.
pub struct ContainerProvisioner {
    engine: Arc<dyn ContainerEngine>,
    shell: Arc<dyn ShellExecutor>,
    scripts: HostScripts,
}

impl ContainerProvisioner {
    pub fn new(engine: Arc<dyn ContainerEngine>, shell: Arc<dyn ShellExecutor>, scripts: HostScripts) -> Self {
        Self {
            engine,
            shell,
            scripts,
        }
    }

    /// Provision a data directory, then create the container.
    ///
    /// Consumes the config; a new attempt needs a new one.
    ///
    /// # Errors
    ///
    /// Returns [`CreationError::VolumeProvisioningFailed`] without touching the
    /// engine when step 1 fails, and the engine's error otherwise.
    pub async fn create(&self, mut config: ContainerConfig) -> Result<CreatedContainer, CreationError> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(CreationError::InvalidConfig(missing));
        }

        debug!("Provisioning volume folder for {}", config.container_name());
        let output = self
            .shell
            .exec(
                &self.scripts.create_volume,
                &[config.container_name().to_string()],
            )
            .await
            .map_err(|e| CreationError::VolumeProvisioningFailed(e.to_string()))?;

        let (volume_path, volume_name) = resolve_volume(&output.stdout).ok_or_else(|| {
            CreationError::VolumeProvisioningFailed(format!(
                "{} printed no volume path",
                self.scripts.create_volume
            ))
        })?;
        info!("Volume folder for {}: {}", config.container_name(), volume_path);
        config.assign_volume(volume_path, volume_name);

        match self.engine.create_container(&config).await {
            Ok(created) => {
                info!(
                    "Created container {} ({})",
                    config.container_name(),
                    created.container_id
                );
                Ok(created)
            }
            Err(e) => {
                warn!(
                    "Creating container {} failed, volume folder {} was left in place: {}",
                    config.container_name(),
                    config.volume_path(),
                    e
                );
                Err(e.into())
            }
        }
    }
}
