//! Docker/Podman client wrapper.
//!
//! Provides a connection to the container daemon with a fallback to the
//! Podman sockets when the Docker defaults are unavailable.

use crate::error::RequestError;
use bollard::Docker;
use std::sync::Arc;
use tracing::{debug, info};

/// Docker/Podman API client wrapper.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Arc<Docker>,
}

impl ContainerClient {
    /// Connect to Docker, falling back to Podman, and verify the connection.
    ///
    /// # Errors
    ///
    /// Returns error if neither Docker nor Podman are reachable.
    pub async fn new() -> Result<Self, RequestError> {
        let docker = Self::connect()?;

        let client = Self {
            docker: Arc::new(docker),
        };

        client.ping().await?;

        Ok(client)
    }

    /// Tries local defaults (Unix socket, named pipe or `DOCKER_HOST`), then Podman sockets.
    fn connect() -> Result<Docker, RequestError> {
        debug!("Attempting to connect to container runtime...");

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                info!("Connected to container runtime via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Local defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut sockets = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                sockets.push(format!("unix://{}/run/podman/podman.sock", home));
            }
            sockets.push("unix:///run/podman/podman.sock".to_string());

            for socket in sockets {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, 120, bollard::API_DEFAULT_VERSION) {
                    Ok(docker) => {
                        info!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        Err(RequestError::unknown(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.",
        ))
    }

    /// Ping the container runtime to verify connectivity.
    pub async fn ping(&self) -> Result<(), RequestError> {
        self.docker.ping().await.map_err(|e| {
            RequestError::unknown(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Get the underlying Docker client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }
}
