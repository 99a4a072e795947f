//! Domain types shared by the orchestrator and its collaborators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Container port SQL Server listens on, in engine notation.
pub const SQL_SERVER_PORT: &str = "1433/tcp";

/// Environment variable carrying the `sa` password inside the container.
pub const SA_PASSWORD_ENV: &str = "MSSQL_SA_PASSWORD";

/// Database the administration service connects to when listing databases.
pub const MASTER_DATABASE: &str = "master";

/// Operator-editable fields of a [`ContainerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerField {
    Image,
    ContainerName,
    Port,
    SaPassword,
}

/// Configuration for a container about to be created.
///
/// Built field by field from operator input and consumed once by the
/// provisioner. The volume fields are filled in by the provisioning step only;
/// there is no public setter for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    image: String,
    container_name: String,
    sa_password: String,
    port: String,
    volume_name: String,
    volume_path: String,
}

impl ContainerConfig {
    pub fn new(
        image: impl Into<String>,
        container_name: impl Into<String>,
        sa_password: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            container_name: container_name.into(),
            sa_password: sa_password.into(),
            port: port.into(),
            ..Default::default()
        }
    }

    /// Apply a single operator edit.
    pub fn set(&mut self, field: ContainerField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ContainerField::Image => self.image = value,
            ContainerField::ContainerName => self.container_name = value,
            ContainerField::Port => self.port = value,
            ContainerField::SaPassword => self.sa_password = value,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn sa_password(&self) -> &str {
        &self.sa_password
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn volume_path(&self) -> &str {
        &self.volume_path
    }

    /// Names of required operator fields that are still blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.image.trim().is_empty() {
            missing.push("image");
        }
        if self.container_name.trim().is_empty() {
            missing.push("containerName");
        }
        if self.sa_password.is_empty() {
            missing.push("saPassword");
        }
        if self.port.trim().is_empty() {
            missing.push("port");
        }
        missing
    }

    pub(crate) fn assign_volume(&mut self, volume_path: String, volume_name: String) {
        self.volume_path = volume_path;
        self.volume_name = volume_name;
    }
}

/// Run state of a SQL container as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
}

impl ContainerStatus {
    /// Collapse an engine status string; everything but `running` is stopped.
    pub fn from_engine(status: &str) -> Self {
        if status.eq_ignore_ascii_case("running") {
            Self::Running
        } else {
            Self::Stopped
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Running => write!(f, "running"),
            ContainerStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// A database inside a SQL container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlDatabase {
    pub name: String,
    pub id: i64,
}

/// Per-container database set produced by a single list or create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseContainer {
    pub container_id: String,
    pub databases: Vec<SqlDatabase>,
}

/// Host port binding reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPortBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Raw container record as reported by the container engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineContainer {
    pub id: String,
    /// Engine name, usually with a leading `/`
    pub name: String,
    pub image: String,
    pub port_bindings: HashMap<String, Vec<HostPortBinding>>,
    /// `KEY=value` entries
    pub env: Vec<String>,
    pub status: String,
}

impl EngineContainer {
    /// Host port bound to the SQL Server port, 0 when unbound or unparsable.
    pub fn sql_host_port(&self) -> u16 {
        self.port_bindings
            .get(SQL_SERVER_PORT)
            .and_then(|bindings| bindings.first())
            .and_then(|binding| binding.host_port.parse().ok())
            .unwrap_or(0)
    }

    /// Value of an environment entry, if present.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then_some(v)
        })
    }
}

/// Response of a successful engine create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedContainer {
    pub container_id: String,
}

/// Response of a successful engine delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedContainer {
    /// Host directory that backed the container's data volume
    pub volume_path: String,
}

/// Connection parameters sent to the administration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub sa_password: String,
    pub port: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
}

impl ConnectionInfo {
    pub fn new(sa_password: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            sa_password: sa_password.into(),
            port: port.into(),
            database_name: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_name = Some(database.into());
        self
    }

    /// Same credentials without a database, as used to stop a session.
    pub fn without_database(&self) -> Self {
        Self {
            database_name: None,
            ..self.clone()
        }
    }
}

/// A SQL Server container in the canonical collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub port: u16,
    pub sa_password: String,
    pub databases: Vec<SqlDatabase>,
}

impl SqlContainer {
    /// Short id, as the engine CLI prints it.
    pub fn display_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }

    /// Image tag without registry and repository, e.g. `2019-latest`.
    pub fn display_image(&self) -> &str {
        self.image.rsplit('/').next().unwrap_or(&self.image)
    }

    pub fn is_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    /// ADO.NET connection string for the `sa` login.
    pub fn connection_string(&self, spaced: bool) -> String {
        let separator = if spaced { "; " } else { ";" };
        [
            format!("Server=localhost,{}", self.port),
            "Initial Catalog=master".to_string(),
            "User Id=sa".to_string(),
            format!("Password={}", self.sa_password),
            "TrustServerCertificate=true".to_string(),
        ]
        .join(separator)
    }

    /// Deep link opening the connection dialog of Azure Data Studio.
    pub fn ads_connection_uri(&self) -> String {
        format!(
            "azuredatastudio://openConnectionDialog?connectionName={}&server=localhost,{}&authenticationType=SqlLogin&user=sa&password={}&database=master&connectionProperties={{\"trustServerCertificate\":\"true\"}}",
            self.name, self.port, self.sa_password
        )
    }

    /// Administration-service parameters targeting `database`.
    pub fn connection_info(&self, database: &str) -> ConnectionInfo {
        ConnectionInfo::new(&self.sa_password, self.port.to_string()).with_database(database)
    }
}

impl From<EngineContainer> for SqlContainer {
    fn from(container: EngineContainer) -> Self {
        let port = container.sql_host_port();
        let sa_password = container
            .env_value(SA_PASSWORD_ENV)
            .unwrap_or_default()
            .to_string();
        let name = container
            .name
            .strip_prefix('/')
            .unwrap_or(&container.name)
            .to_string();

        Self {
            status: ContainerStatus::from_engine(&container.status),
            id: container.id,
            name,
            image: container.image,
            port,
            sa_password,
            databases: Vec::new(),
        }
    }
}
