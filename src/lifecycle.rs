//! Start, stop and delete commands for existing containers.

use crate::engine::ContainerEngine;
use crate::error::RequestError;
use crate::executor::{ExecutorError, HostScripts, ShellExecutor};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine failure of a lifecycle command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{name}: {message}")]
    EngineRejected {
        status_code: u16,
        name: String,
        message: String,
    },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl LifecycleError {
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::EngineRejected { status_code, .. } => *status_code,
            LifecycleError::Unknown { .. } => 500,
        }
    }
}

impl From<RequestError> for LifecycleError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Service(e) => LifecycleError::EngineRejected {
                status_code: e.status_code,
                name: e.name,
                message: e.message,
            },
            RequestError::Unknown(message) => LifecycleError::Unknown { message },
        }
    }
}

/// Failure of the host-side data cleanup after a confirmed delete.
#[derive(Debug, thiserror::Error)]
pub enum VolumeCleanupError {
    #[error("The engine reported no volume path")]
    NoVolumePath,

    #[error("Volume folder removal failed: {0}")]
    ScriptFailed(#[from] ExecutorError),
}

/// What happened to the container's data directory.
#[derive(Debug)]
pub enum VolumeCleanup {
    /// Data was kept
    Skipped,
    Removed,
    /// The container is gone but its data may remain
    Failed(VolumeCleanupError),
}

/// Result of a confirmed delete.
#[derive(Debug)]
pub struct DeleteReport {
    pub container_id: String,
    /// Host directory that backed the container, empty if unknown
    pub volume_path: String,
    pub volume_cleanup: VolumeCleanup,
}

/// Runs lifecycle commands, one engine call each.
pub struct ContainerLifecycleManager {
    engine: Arc<dyn ContainerEngine>,
    shell: Arc<dyn ShellExecutor>,
    scripts: HostScripts,
}

impl ContainerLifecycleManager {
    pub fn new(engine: Arc<dyn ContainerEngine>, shell: Arc<dyn ShellExecutor>, scripts: HostScripts) -> Self {
        Self {
            engine,
            shell,
            scripts,
        }
    }

    pub async fn start(&self, container_id: &str) -> Result<(), LifecycleError> {
        debug!("Start requested for container {}", container_id);
        self.engine.start_container(container_id).await?;
        Ok(())
    }

    pub async fn stop(&self, container_id: &str) -> Result<(), LifecycleError> {
        debug!("Stop requested for container {}", container_id);
        self.engine.stop_container(container_id).await?;
        Ok(())
    }

    /// Delete the container and, if asked, its host data directory.
    ///
    /// The data directory is only touched after the engine confirmed the
    /// delete. A cleanup failure does not fail the delete; it is reported in
    /// [`DeleteReport::volume_cleanup`].
    pub async fn delete(&self, container_id: &str, delete_volume_data: bool) -> Result<DeleteReport, LifecycleError> {
        let deleted = self.engine.delete_container(container_id).await?;
        info!("Deleted container {}", container_id);

        let volume_cleanup = if !delete_volume_data {
            VolumeCleanup::Skipped
        } else if deleted.volume_path.is_empty() {
            warn!("No volume path reported for container {}", container_id);
            VolumeCleanup::Failed(VolumeCleanupError::NoVolumePath)
        } else {
            match self
                .shell
                .exec(&self.scripts.delete_volume, &[deleted.volume_path.clone()])
                .await
            {
                Ok(_) => {
                    info!("Removed volume folder {}", deleted.volume_path);
                    VolumeCleanup::Removed
                }
                Err(e) => {
                    warn!("Failed to remove volume folder {}: {}", deleted.volume_path, e);
                    VolumeCleanup::Failed(e.into())
                }
            }
        };

        Ok(DeleteReport {
            container_id: container_id.to_string(),
            volume_path: deleted.volume_path,
            volume_cleanup,
        })
    }
}
