//! # SQL Containers
//!
//! Provisions and manages local SQL Server containers and ephemeral
//! interactive `sqlcmd` sessions against them.
//!
//! ## Architecture Overview
//!
//! The orchestrator composes a few managers, each driving one workflow against
//! an external collaborator it only knows through a trait:
//!
//! - **[`app`]**: [`App`], the state holder that owns the canonical container
//!   list and database index and mediates every command
//! - **[`provision`]**: volume folder provisioning followed by container creation
//! - **[`lifecycle`]**: start, stop and delete, including host data cleanup
//! - **[`session`]**: bounded readiness polling and the per-container session state machine
//! - **[`reconcile`]**: merging per-container database lists into the index
//! - **[`engine`]**: container engine seam and its Docker/Podman implementation
//! - **[`admin`]**: administration service seam and its HTTP client
//! - **[`executor`]**: host shell seam running the volume helper scripts
//!
//! ## Features
//!
//! ### 🐳 Containers
//! - **Bind-mounted data**: every container keeps `/var/opt/mssql` in a host
//!   folder under `~/.sqlcontainers`, so data outlives the container
//! - **Structured failures**: engine errors keep their status code and message
//!
//! ### 🖥️ Sessions
//! - **Cancellable polling**: readiness is polled in the background and closing
//!   a session cancels its poll
//! - **Observable state**: each container's session state is a `watch` channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlcontainers::{App, AppOptions, ContainerField};
//! use sqlcontainers::admin::{AdminServiceConfig, HttpAdminService};
//! use sqlcontainers::engine::{DockerEngine, DockerEngineConfig};
//! use sqlcontainers::executor::HostExecutor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(DockerEngine::connect(DockerEngineConfig::default()).await?);
//!     let admin = Arc::new(HttpAdminService::new(&AdminServiceConfig::default())?);
//!     let shell = Arc::new(HostExecutor::new().with_scripts_dir("scripts"));
//!
//!     let mut app = App::new(engine, admin, shell, AppOptions::default());
//!     app.edit_draft(ContainerField::Image, "mcr.microsoft.com/mssql/server:2022-latest");
//!     app.edit_draft(ContainerField::ContainerName, "demo1");
//!     app.edit_draft(ContainerField::Port, "51433");
//!     app.generate_password();
//!
//!     let created = app.create_container().await?;
//!     println!("Created {}", created.container_id);
//!     Ok(())
//! }
//! ```

/// Administration service client.
pub mod admin;

/// Orchestrator owning the canonical state.
pub mod app;

/// Argument parsing and configuration for the `sqlc` binary.
pub mod cli;

/// Container engine seam and Docker/Podman implementation.
pub mod engine;

pub mod env;
pub mod error;

/// Host script execution.
pub mod executor;

pub mod lifecycle;
pub mod model;
pub mod password;
pub mod provision;
pub mod reconcile;

/// Readiness polling and interactive sessions.
pub mod session;

#[cfg(test)]
mod testing;

pub use app::{App, AppOptions, DatabaseError, PortError};
pub use error::{RequestError, ServiceError};
pub use lifecycle::{DeleteReport, LifecycleError, VolumeCleanup, VolumeCleanupError};
pub use model::{
    ConnectionInfo, ContainerConfig, ContainerField, ContainerStatus, SqlContainer, SqlDatabase,
};
pub use provision::CreationError;
pub use session::{SessionError, SessionState};
