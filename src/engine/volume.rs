//! Data volume management.
//!
//! SQL containers keep their files in a `local` volume bound to a host
//! directory, so the data survives the container and stays visible on the host.

use crate::error::RequestError;
use bollard::Docker;
use std::collections::HashMap;
use tracing::{debug, info};

/// Driver option holding the host directory of a bind volume.
pub const DEVICE_OPTION: &str = "device";

/// Volume manager for the data volumes.
pub struct VolumeManager {
    docker: Docker,
}

impl VolumeManager {
    /// Create a new volume manager.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Create a `local` volume bound to `host_path`.
    pub async fn create_bind_volume(
        &self,
        name: &str,
        host_path: &str,
    ) -> Result<String, RequestError> {
        debug!("Creating volume {} bound to {}", name, host_path);

        let driver_opts = HashMap::from([(DEVICE_OPTION, host_path), ("o", "bind"), ("type", "none")]);

        let response = self
            .docker
            .create_volume(bollard::volume::CreateVolumeOptions {
                name,
                driver: "local",
                driver_opts,
                labels: HashMap::new(),
            })
            .await?;

        info!("Created volume: {}", response.name);

        Ok(response.name)
    }

    /// Host directory a bind volume points at, if it has one.
    pub async fn device_path(&self, volume_name: &str) -> Result<Option<String>, RequestError> {
        let volume = self.docker.inspect_volume(volume_name).await?;
        Ok(volume.options.get(DEVICE_OPTION).cloned())
    }

    /// Remove a volume.
    pub async fn remove_volume(&self, volume_name: &str, force: bool) -> Result<(), RequestError> {
        debug!("Removing volume: {}", volume_name);

        self.docker
            .remove_volume(
                volume_name,
                Some(bollard::volume::RemoveVolumeOptions { force }),
            )
            .await?;

        info!("Removed volume: {}", volume_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker/Podman
    async fn test_bind_volume_lifecycle() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let manager = VolumeManager::new(docker);

        let dir = tempfile::TempDir::new().unwrap();
        let host_path = dir.path().display().to_string();
        let name = format!("sqlcontainers-test-{}", uuid::Uuid::new_v4());

        let volume_name = manager.create_bind_volume(&name, &host_path).await.unwrap();
        assert_eq!(
            manager.device_path(&volume_name).await.unwrap().as_deref(),
            Some(host_path.as_str())
        );

        manager.remove_volume(&volume_name, true).await.unwrap();
    }
}
