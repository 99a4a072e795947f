//! Container engine access.
//!
//! The orchestrator consumes the engine only through [`ContainerEngine`]. The
//! Docker/Podman implementation lives behind the `containers` feature and talks
//! to the daemon through the bollard API.
//!
//! ## Architecture
//!
//! - [`ContainerEngine`]: list/create/start/stop/delete, reporting structured failures
//! - [`DockerEngine`]: bollard-backed engine that creates SQL Server containers
//!   with a bind-mounted data volume
//! - [`ContainerClient`]: Docker/Podman connection with socket fallback
//! - [`VolumeManager`]: bind volume creation, inspection and removal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sqlcontainers::engine::{ContainerEngine, DockerEngine, DockerEngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = DockerEngine::connect(DockerEngineConfig::default()).await?;
//!
//!     for container in engine.list_containers().await? {
//!         println!("{} {} {}", container.id, container.name, container.status);
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::RequestError;
use crate::model::{
    ContainerConfig, CreatedContainer, DeletedContainer, EngineContainer, SQL_SERVER_PORT,
};
use async_trait::async_trait;

#[cfg(feature = "containers")]
mod client;
#[cfg(feature = "containers")]
mod docker;
#[cfg(feature = "containers")]
mod volume;

#[cfg(feature = "containers")]
pub use client::ContainerClient;
#[cfg(feature = "containers")]
pub use docker::{DockerEngine, DockerEngineConfig};
#[cfg(feature = "containers")]
pub use volume::VolumeManager;

/// Image repositories recognised as SQL Server.
pub const SUPPORTED_IMAGES: &[&str] = &["mcr.microsoft.com/mssql/server"];

/// Image tags offered when creating a container.
pub const IMAGE_CHOICES: &[&str] = &[
    "mcr.microsoft.com/mssql/server:2022-latest",
    "mcr.microsoft.com/mssql/server:2019-latest",
    "mcr.microsoft.com/mssql/server:2017-latest",
];

/// Container engine management service.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// All SQL containers known to the engine, running or not.
    async fn list_containers(&self) -> Result<Vec<EngineContainer>, RequestError>;

    /// Create and start a container from a fully provisioned config.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<CreatedContainer, RequestError>;

    async fn start_container(&self, id: &str) -> Result<(), RequestError>;

    async fn stop_container(&self, id: &str) -> Result<(), RequestError>;

    /// Remove a container and its volume, reporting the volume's host path.
    async fn delete_container(&self, id: &str) -> Result<DeletedContainer, RequestError>;
}

/// Repository part of an image reference (`repo:tag` → `repo`).
pub fn image_repository(image: &str) -> &str {
    match image.rsplit_once(':') {
        // a colon after the last `/` separates the tag, otherwise it is a registry port
        Some((repo, tag)) if !tag.contains('/') => repo,
        _ => image,
    }
}

/// Whether `image` refers to one of the `supported` repositories.
pub fn is_supported_image<S: AsRef<str>>(image: &str, supported: &[S]) -> bool {
    supported.iter().any(|s| image.contains(s.as_ref()))
}

/// Whether an engine container should be listed as a SQL container.
///
/// Matches on the image repository first, then on a binding of the SQL Server port.
pub fn is_sql_container<S: AsRef<str>>(container: &EngineContainer, supported: &[S]) -> bool {
    let repository = image_repository(&container.image);
    supported.iter().any(|s| s.as_ref() == repository)
        || container.port_bindings.contains_key(SQL_SERVER_PORT)
}
