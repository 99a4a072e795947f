//! SQL administration service.
//!
//! The administration service runs next to the engine and does the work that
//! needs a SQL connection: listing and creating databases, and hosting the
//! interactive `sqlcmd` terminal. It is addressed by the container's published
//! port rather than by container id.

use crate::error::RequestError;
use crate::model::{ConnectionInfo, SqlDatabase};
use async_trait::async_trait;

mod http;

pub use http::{AdminServiceConfig, HttpAdminService};

/// Per-container administration operations.
#[async_trait]
pub trait AdminService: Send + Sync {
    /// User databases plus `master`.
    async fn list_databases(&self, info: &ConnectionInfo) -> Result<Vec<SqlDatabase>, RequestError>;

    /// Create `info.database_name` and return the refreshed list.
    async fn create_database(&self, info: &ConnectionInfo)
    -> Result<Vec<SqlDatabase>, RequestError>;

    /// Launch the interactive terminal against `info.database_name`.
    async fn start_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError>;

    async fn stop_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError>;

    /// Whether the interactive terminal is accepting connections.
    async fn ready(&self) -> Result<bool, RequestError>;
}
