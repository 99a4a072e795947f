//! # Orchestrator
//!
//! [`App`] owns the canonical container list and database index and is the
//! only writer of both. Every command runs one workflow against the external
//! services and, on success, refreshes the canonical state from the engine.
//! Failed commands leave the state untouched.
//!
//! Commands take `&mut self`, so at most one command runs per `App` at a time.
//! Interactive session state is the exception: it is advanced by background
//! pollers and read through [`App::session_state`] and [`App::subscribe_session`].

use crate::admin::AdminService;
use crate::engine::ContainerEngine;
use crate::error::RequestError;
use crate::executor::{HostScripts, ShellExecutor};
use crate::lifecycle::{ContainerLifecycleManager, DeleteReport, LifecycleError};
use crate::model::{
    ConnectionInfo, ContainerConfig, ContainerField, CreatedContainer, DatabaseContainer,
    MASTER_DATABASE, SqlContainer, SqlDatabase,
};
use crate::password::generate_password;
use crate::provision::{ContainerProvisioner, CreationError};
use crate::reconcile::{DatabaseIndex, prune, reconcile_record};
use crate::session::{
    CliSessionManager, PollConfig, PollOutcome, SessionError, SessionInfo, SessionPoller,
    SessionState,
};
use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Host ports an operator may publish SQL Server on.
pub const ALLOWED_PORTS: RangeInclusive<u16> = 1024..=65535;

/// Failures of the database commands.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Container {0} not found")]
    ContainerNotFound(String),

    #[error("Container {0} is not running")]
    ContainerNotRunning(String),

    #[error("Database name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Port problems found before a container is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Port must be a number, got {0:?}")]
    NotANumber(String),

    #[error("Please enter a valid port number between 1024 and 65535")]
    OutOfRange(u16),

    #[error("Port number {0} already in use on a running container")]
    InUse(u16),
}

/// Tunables for the orchestrator's workflows.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub scripts: HostScripts,
    /// Readiness polling of interactive sessions
    pub session_poll: PollConfig,
    /// Retrying an empty database list while SQL Server starts up
    pub database_retry: PollConfig,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            scripts: HostScripts::current(),
            session_poll: PollConfig::default(),
            database_retry: PollConfig::from_millis(5000, 5),
        }
    }
}

/// Top-level state holder mediating every operator command.
pub struct App {
    engine: Arc<dyn ContainerEngine>,
    admin: Arc<dyn AdminService>,
    provisioner: ContainerProvisioner,
    lifecycle: ContainerLifecycleManager,
    sessions: CliSessionManager,
    database_retry: SessionPoller,
    containers: Vec<SqlContainer>,
    databases: DatabaseIndex,
    draft: Option<ContainerConfig>,
    last_creation: Option<Result<CreatedContainer, CreationError>>,
    last_refresh: Option<DateTime<Utc>>,
}

impl App {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        admin: Arc<dyn AdminService>,
        shell: Arc<dyn ShellExecutor>,
        options: AppOptions,
    ) -> Self {
        Self {
            provisioner: ContainerProvisioner::new(
                engine.clone(),
                shell.clone(),
                options.scripts.clone(),
            ),
            lifecycle: ContainerLifecycleManager::new(engine.clone(), shell, options.scripts),
            sessions: CliSessionManager::new(admin.clone(), options.session_poll),
            database_retry: SessionPoller::new(options.database_retry),
            engine,
            admin,
            containers: Vec::new(),
            databases: DatabaseIndex::new(),
            draft: None,
            last_creation: None,
            last_refresh: None,
        }
    }

    pub fn containers(&self) -> &[SqlContainer] {
        &self.containers
    }

    pub fn container(&self, container_id: &str) -> Option<&SqlContainer> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    /// Look a container up by id, short id or name.
    pub fn find_container(&self, key: &str) -> Option<&SqlContainer> {
        self.container(key).or_else(|| {
            self.containers
                .iter()
                .find(|c| c.name == key || (key.len() >= 4 && c.id.starts_with(key)))
        })
    }

    /// Databases last fetched for a container.
    pub fn databases(&self, container_id: &str) -> &[SqlDatabase] {
        self.databases
            .get(container_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn database_index(&self) -> &DatabaseIndex {
        &self.databases
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Outcome of the most recent creation attempt.
    pub fn last_creation(&self) -> Option<&Result<CreatedContainer, CreationError>> {
        self.last_creation.as_ref()
    }

    // --- creation draft ---

    pub fn draft(&self) -> Option<&ContainerConfig> {
        self.draft.as_ref()
    }

    /// Apply an operator edit, starting an empty draft on first touch.
    pub fn edit_draft(&mut self, field: ContainerField, value: impl Into<String>) {
        self.draft.get_or_insert_with(ContainerConfig::default).set(field, value);
    }

    pub fn set_draft(&mut self, config: ContainerConfig) {
        self.draft = Some(config);
    }

    /// Fill the draft's password with a generated one and return it.
    pub fn generate_password(&mut self) -> String {
        let password = generate_password();
        self.edit_draft(ContainerField::SaPassword, password.clone());
        password
    }

    /// Whether a running container already publishes `port`.
    pub fn port_in_use(&self, port: u16) -> bool {
        self.containers
            .iter()
            .any(|c| c.is_running() && c.port == port)
    }

    pub fn validate_port(&self, port: &str) -> Result<u16, PortError> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| PortError::NotANumber(port.to_string()))?;
        if !ALLOWED_PORTS.contains(&port) {
            return Err(PortError::OutOfRange(port));
        }
        if self.port_in_use(port) {
            return Err(PortError::InUse(port));
        }
        Ok(port)
    }

    // --- container commands ---

    /// Create a container from the draft, which is consumed by the attempt.
    pub async fn create_container(&mut self) -> Result<CreatedContainer, CreationError> {
        let config = self.draft.take().unwrap_or_default();
        info!("Creating container: {}", config.container_name());

        let result = self.provisioner.create(config).await;
        if result.is_ok() {
            self.refresh_after_command().await;
        }

        self.last_creation = Some(result.clone());
        result
    }

    /// Replace the canonical list with the engine's listing.
    ///
    /// Known databases are carried over by id; index entries and sessions of
    /// containers that disappeared are dropped.
    pub async fn refresh_containers(&mut self) -> Result<(), RequestError> {
        let listed = self.engine.list_containers().await?;

        let mut containers: Vec<SqlContainer> = Vec::with_capacity(listed.len());
        for raw in listed {
            let mut container = SqlContainer::from(raw);
            if containers.iter().any(|c| c.id == container.id) {
                continue;
            }
            container.databases = self.databases.get(&container.id).cloned().unwrap_or_default();
            containers.push(container);
        }

        for id in prune(&mut self.databases, containers.iter().map(|c| c.id.as_str())) {
            debug!("Dropping databases of vanished container {}", id);
            self.sessions.forget(&id);
        }

        debug!("Container list refreshed: {} container(s)", containers.len());
        self.containers = containers;
        self.last_refresh = Some(Utc::now());
        Ok(())
    }

    pub async fn start_container(&mut self, container_id: &str) -> Result<(), LifecycleError> {
        self.lifecycle.start(container_id).await?;
        self.refresh_after_command().await;
        Ok(())
    }

    /// Stop a container, then close its interactive session.
    ///
    /// The session stays open when the engine refuses the stop.
    pub async fn stop_container(&mut self, container_id: &str) -> Result<(), LifecycleError> {
        self.lifecycle.stop(container_id).await?;
        self.close_session_quietly(container_id).await;
        self.refresh_after_command().await;
        Ok(())
    }

    /// Delete a container, then close and forget its interactive session.
    pub async fn delete_container(
        &mut self,
        container_id: &str,
        delete_volume_data: bool,
    ) -> Result<DeleteReport, LifecycleError> {
        let report = self.lifecycle.delete(container_id, delete_volume_data).await?;
        self.close_session_quietly(container_id).await;
        self.sessions.forget(container_id);

        // the engine confirmed the delete, so drop it even if the refresh fails
        self.containers.retain(|c| c.id != container_id);
        self.databases.remove(container_id);

        self.refresh_after_command().await;
        Ok(report)
    }

    async fn refresh_after_command(&mut self) {
        if let Err(e) = self.refresh_containers().await {
            warn!("Failed to refresh container list: {}", e);
        }
    }

    // --- database commands ---

    /// Fetch a container's databases, retrying while the list comes back empty.
    ///
    /// A list that stays empty (or keeps failing) for the whole retry budget is
    /// recorded as empty.
    pub async fn refresh_databases(&mut self, container_id: &str) -> Result<&[SqlDatabase], DatabaseError> {
        let info = self.running_connection(container_id, MASTER_DATABASE)?;
        let admin = self.admin.clone();

        let outcome = self
            .database_retry
            .poll_until(
                || {
                    let admin = admin.clone();
                    let info = info.clone();
                    async move {
                        let databases = admin.list_databases(&info).await?;
                        Ok::<_, RequestError>((!databases.is_empty()).then_some(databases))
                    }
                },
                &CancellationToken::new(),
            )
            .await;

        let databases = match outcome {
            PollOutcome::Ready(databases) => databases,
            PollOutcome::TimedOut | PollOutcome::Cancelled => {
                warn!("No databases listed for container {}", container_id);
                Vec::new()
            }
        };

        self.apply_databases(container_id, databases);
        Ok(self.databases(container_id))
    }

    /// Create a database and record the list the service returns.
    pub async fn create_database(&mut self, container_id: &str, name: &str) -> Result<&[SqlDatabase], DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::EmptyName);
        }

        let info = self.running_connection(container_id, name)?;
        info!("Creating database {} in container {}", name, container_id);
        let databases = self.admin.create_database(&info).await?;

        self.apply_databases(container_id, databases);
        Ok(self.databases(container_id))
    }

    fn running_connection(&self, container_id: &str, database: &str) -> Result<ConnectionInfo, DatabaseError> {
        let container = self
            .container(container_id)
            .ok_or_else(|| DatabaseError::ContainerNotFound(container_id.to_string()))?;
        if !container.is_running() {
            return Err(DatabaseError::ContainerNotRunning(container_id.to_string()));
        }
        Ok(container.connection_info(database))
    }

    fn apply_databases(&mut self, container_id: &str, databases: Vec<SqlDatabase>) {
        // the container may have been removed while the request was in flight
        if self.container(container_id).is_none() {
            debug!("Discarding databases of unknown container {}", container_id);
            return;
        }

        self.databases = reconcile_record(
            &self.databases,
            DatabaseContainer {
                container_id: container_id.to_string(),
                databases: databases.clone(),
            },
        );
        if let Some(container) = self.containers.iter_mut().find(|c| c.id == container_id) {
            container.databases = databases;
        }
    }

    // --- interactive sessions ---

    pub async fn open_session(&mut self, container_id: &str, database: &str) -> Result<(), SessionError> {
        let container = self
            .container(container_id)
            .ok_or_else(|| SessionError::ContainerNotFound(container_id.to_string()))?;
        if !container.is_running() {
            return Err(SessionError::ContainerNotRunning(container_id.to_string()));
        }

        self.sessions.open(container, database).await
    }

    pub async fn close_session(&mut self, container_id: &str) -> Result<(), SessionError> {
        self.sessions.close(container_id).await
    }

    async fn close_session_quietly(&self, container_id: &str) {
        if let Err(e) = self.sessions.close(container_id).await {
            warn!("Failed to close session for container {}: {}", container_id, e);
        }
    }

    pub fn session_state(&self, container_id: &str) -> SessionState {
        self.sessions.state(container_id)
    }

    pub fn session(&self, container_id: &str) -> Option<SessionInfo> {
        self.sessions.session(container_id)
    }

    pub fn subscribe_session(&self, container_id: &str) -> watch::Receiver<SessionState> {
        self.sessions.subscribe(container_id)
    }

    /// Wait for a pending session to become ready or unavailable.
    pub async fn wait_for_session(&self, container_id: &str) -> SessionState {
        self.sessions.wait_settled(container_id).await
    }

    /// Close every open session.
    pub async fn shutdown(&self) {
        self.sessions.close_all().await;
    }
}
