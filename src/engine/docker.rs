//! Docker/Podman implementation of the container engine.

use super::{ContainerClient, ContainerEngine, SUPPORTED_IMAGES, VolumeManager, is_sql_container, is_supported_image};
use crate::error::{RequestError, ServiceError};
use crate::model::{
    ContainerConfig, CreatedContainer, DeletedContainer, EngineContainer, HostPortBinding,
    SA_PASSWORD_ENV, SQL_SERVER_PORT,
};
use async_trait::async_trait;
use bollard::models::ContainerInspectResponse;
use bollard::service::{HostConfig, Mount, MountTypeEnum, PortBinding};
use futures::stream::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Mount point of the data volume inside SQL Server containers.
pub const DATA_MOUNT_TARGET: &str = "/var/opt/mssql";

impl From<bollard::errors::Error> for RequestError {
    fn from(error: bollard::errors::Error) -> Self {
        match error {
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => RequestError::Service(ServiceError::new(
                status_code,
                "DockerResponseServerError",
                message,
            )),
            other => RequestError::Unknown(other.to_string()),
        }
    }
}

/// Docker engine configuration.
#[derive(Debug, Clone)]
pub struct DockerEngineConfig {
    /// Image repositories accepted for creation and listing
    pub supported_images: Vec<String>,
    /// Pull the image before creating a container
    pub pull_images: bool,
    /// Seconds to wait for a graceful stop
    pub stop_timeout: i64,
}

impl Default for DockerEngineConfig {
    fn default() -> Self {
        Self {
            supported_images: SUPPORTED_IMAGES.iter().map(|s| s.to_string()).collect(),
            pull_images: true,
            stop_timeout: 10,
        }
    }
}

/// Container engine backed by the Docker/Podman API.
pub struct DockerEngine {
    client: ContainerClient,
    volumes: VolumeManager,
    config: DockerEngineConfig,
}

impl DockerEngine {
    /// Connect to the local daemon.
    pub async fn connect(config: DockerEngineConfig) -> Result<Self, RequestError> {
        let client = ContainerClient::new().await?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: ContainerClient, config: DockerEngineConfig) -> Self {
        let volumes = VolumeManager::new(client.docker().clone());
        Self {
            client,
            volumes,
            config,
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), RequestError> {
        info!("Pulling image: {}", image);

        let mut stream = self.client.docker().create_image(
            Some(bollard::image::CreateImageOptions {
                from_image: image,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            let progress = result?;
            if let Some(status) = progress.status {
                debug!("Pull status: {}", status);
            }
        }

        info!("Successfully pulled image: {}", image);
        Ok(())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInspectResponse, RequestError> {
        Ok(self
            .client
            .docker()
            .inspect_container(id, None::<bollard::query_parameters::InspectContainerOptions>)
            .await?)
    }
}

/// Flatten an inspect response into the engine record the orchestrator consumes.
pub(crate) fn engine_container(inspect: ContainerInspectResponse) -> Option<EngineContainer> {
    let id = inspect.id?;
    let config = inspect.config.unwrap_or_default();

    let port_bindings = inspect
        .host_config
        .and_then(|hc| hc.port_bindings)
        .unwrap_or_default()
        .into_iter()
        .map(|(port, bindings)| {
            let bindings = bindings
                .unwrap_or_default()
                .into_iter()
                .map(|b| HostPortBinding {
                    host_ip: b.host_ip.unwrap_or_default(),
                    host_port: b.host_port.unwrap_or_default(),
                })
                .collect();
            (port, bindings)
        })
        .collect();

    Some(EngineContainer {
        id,
        name: inspect.name.unwrap_or_default(),
        image: config.image.unwrap_or_default(),
        port_bindings,
        env: config.env.unwrap_or_default(),
        status: inspect
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_default(),
    })
}

/// Treat a 404 as "no longer there" instead of a failure.
fn skip_not_found<T>(result: Result<T, RequestError>) -> Result<Option<T>, RequestError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.status_code() == Some(404) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<EngineContainer>, RequestError> {
        let summaries = self
            .client
            .docker()
            .list_containers(Some(bollard::container::ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        let mut containers = Vec::new();
        for summary in summaries {
            let Some(id) = summary.id else { continue };
            let Some(inspect) = skip_not_found(self.inspect(&id).await)? else {
                debug!("Container {} disappeared while listing", id);
                continue;
            };
            let Some(container) = engine_container(inspect) else {
                continue;
            };
            if is_sql_container(&container, &self.config.supported_images) {
                containers.push(container);
            }
        }

        debug!("Listed {} SQL containers", containers.len());
        Ok(containers)
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<CreatedContainer, RequestError> {
        if !is_supported_image(config.image(), &self.config.supported_images) {
            return Err(ServiceError::new(
                400,
                "Bad Request",
                format!("Image not supported: {}", config.image()),
            )
            .into());
        }

        if self.config.pull_images {
            self.pull_image(config.image()).await?;
        }

        self.volumes
            .create_bind_volume(config.volume_name(), config.volume_path())
            .await?;

        let exposed_ports = HashMap::from([(SQL_SERVER_PORT.to_string(), HashMap::new())]);
        let port_bindings = HashMap::from([(
            SQL_SERVER_PORT.to_string(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(config.port().to_string()),
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            mounts: Some(vec![Mount {
                typ: Some(MountTypeEnum::VOLUME),
                source: Some(config.volume_name().to_string()),
                target: Some(DATA_MOUNT_TARGET.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let body = bollard::container::Config {
            image: Some(config.image().to_string()),
            env: Some(vec![
                "ACCEPT_EULA=1".to_string(),
                "MSSQL_PID=Express".to_string(),
                format!("{}={}", SA_PASSWORD_ENV, config.sa_password()),
            ]),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        debug!("Creating container: {}", config.container_name());

        let response = self
            .client
            .docker()
            .create_container(
                Some(bollard::container::CreateContainerOptions {
                    name: config.container_name(),
                    ..Default::default()
                }),
                body,
            )
            .await?;

        info!("Created container: {} ({})", config.container_name(), response.id);

        self.start_container(&response.id).await?;

        Ok(CreatedContainer {
            container_id: response.id,
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), RequestError> {
        debug!("Starting container: {}", id);

        self.client
            .docker()
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await?;

        info!("Started container: {}", id);
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RequestError> {
        debug!("Stopping container: {}", id);

        self.client
            .docker()
            .stop_container(
                id,
                Some(bollard::container::StopContainerOptions {
                    t: self.config.stop_timeout,
                }),
            )
            .await?;

        info!("Stopped container: {}", id);
        Ok(())
    }

    async fn delete_container(&self, id: &str) -> Result<DeletedContainer, RequestError> {
        let volume_name = self
            .inspect(id)
            .await?
            .host_config
            .and_then(|hc| hc.mounts)
            .and_then(|mounts| mounts.into_iter().next())
            .and_then(|mount| mount.source);

        debug!("Removing container: {}", id);
        self.client
            .docker()
            .remove_container(
                id,
                Some(bollard::container::RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        info!("Removed container: {}", id);

        let Some(volume_name) = volume_name else {
            warn!("Container {} had no data volume", id);
            return Ok(DeletedContainer::default());
        };

        let volume_path = self.volumes.device_path(&volume_name).await?.unwrap_or_default();
        self.volumes.remove_volume(&volume_name, true).await?;

        Ok(DeletedContainer { volume_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig as InspectConfig, ContainerState, ContainerStateStatusEnum};

    #[test]
    fn test_engine_container_from_inspect() {
        let inspect = ContainerInspectResponse {
            id: Some("abc123".to_string()),
            name: Some("/demo1".to_string()),
            config: Some(InspectConfig {
                image: Some("mcr.microsoft.com/mssql/server:2022-latest".to_string()),
                env: Some(vec!["MSSQL_SA_PASSWORD=Abcdef12".to_string()]),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                port_bindings: Some(HashMap::from([(
                    SQL_SERVER_PORT.to_string(),
                    Some(vec![PortBinding {
                        host_ip: Some("0.0.0.0".to_string()),
                        host_port: Some("51433".to_string()),
                    }]),
                )])),
                ..Default::default()
            }),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = engine_container(inspect).unwrap();
        assert_eq!(container.id, "abc123");
        assert_eq!(container.status, "running");
        assert_eq!(container.sql_host_port(), 51433);
        assert_eq!(container.env_value(SA_PASSWORD_ENV), Some("Abcdef12"));
    }

    #[test]
    fn test_inspect_without_id_is_skipped() {
        assert!(engine_container(ContainerInspectResponse::default()).is_none());
    }

    #[test]
    fn test_vanished_container_is_skipped() {
        let gone: Result<(), RequestError> = Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc123".to_string(),
        }
        .into());
        assert_eq!(skip_not_found(gone), Ok(None));

        let refused: Result<(), RequestError> = Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "server error".to_string(),
        }
        .into());
        assert_eq!(skip_not_found(refused).unwrap_err().status_code(), Some(500));

        assert_eq!(skip_not_found(Ok::<_, RequestError>(7)), Ok(Some(7)));
    }

    #[test]
    fn test_bollard_error_mapping() {
        let structured: RequestError = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "Conflict. The container name \"/demo1\" is already in use".to_string(),
        }
        .into();
        assert_eq!(structured.status_code(), Some(409));

        let unknown: RequestError = bollard::errors::Error::RequestTimeoutError.into();
        assert!(matches!(unknown, RequestError::Unknown(_)));
    }
}
