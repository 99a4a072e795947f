//! In-memory collaborators for unit tests.

use crate::admin::AdminService;
use crate::engine::ContainerEngine;
use crate::error::{RequestError, ServiceError};
use crate::executor::{ExecutionResult, ExecutorError, ShellExecutor};
use crate::model::{
    ConnectionInfo, ContainerConfig, CreatedContainer, DeletedContainer, EngineContainer,
    HostPortBinding, SA_PASSWORD_ENV, SQL_SERVER_PORT, SqlDatabase,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn not_found(id: &str) -> RequestError {
    ServiceError::new(404, "Not Found", format!("No such container: {}", id)).into()
}

pub fn engine_record(id: &str, name: &str, port: u16, password: &str, status: &str) -> EngineContainer {
    EngineContainer {
        id: id.to_string(),
        name: format!("/{}", name),
        image: "mcr.microsoft.com/mssql/server:2022-latest".to_string(),
        port_bindings: HashMap::from([(
            SQL_SERVER_PORT.to_string(),
            vec![HostPortBinding {
                host_ip: "0.0.0.0".to_string(),
                host_port: port.to_string(),
            }],
        )]),
        env: vec![format!("{}={}", SA_PASSWORD_ENV, password)],
        status: status.to_string(),
    }
}

pub fn database(name: &str, id: i64) -> SqlDatabase {
    SqlDatabase {
        name: name.to_string(),
        id,
    }
}

#[derive(Default)]
struct EngineState {
    containers: Vec<EngineContainer>,
    volume_paths: HashMap<String, String>,
    next_id: Option<String>,
    failures: HashMap<&'static str, RequestError>,
    calls: Vec<String>,
    created: Vec<ContainerConfig>,
}

/// Container engine keeping its containers in memory.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, container: EngineContainer) -> Self {
        self.state.lock().unwrap().containers.push(container);
        self
    }

    pub fn with_volume(self, id: &str, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .volume_paths
            .insert(id.to_string(), path.to_string());
        self
    }

    /// Id handed out by the next successful create.
    pub fn with_next_id(self, id: &str) -> Self {
        self.state.lock().unwrap().next_id = Some(id.to_string());
        self
    }

    /// Make every call to `operation` fail with `error`.
    pub fn fail(&self, operation: &'static str, error: RequestError) {
        self.state.lock().unwrap().failures.insert(operation, error);
    }

    pub fn count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .count()
    }

    pub fn created_configs(&self) -> Vec<ContainerConfig> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn remove_externally(&self, id: &str) {
        self.state.lock().unwrap().containers.retain(|c| c.id != id);
    }

    fn begin(&self, operation: &'static str, target: &str) -> Result<(), RequestError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{}:{}", operation, target));
        match state.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn set_status(&self, id: &str, status: &str) -> Result<(), RequestError> {
        let mut state = self.state.lock().unwrap();
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        container.status = status.to_string();
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn list_containers(&self) -> Result<Vec<EngineContainer>, RequestError> {
        self.begin("list", "")?;
        Ok(self.state.lock().unwrap().containers.clone())
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<CreatedContainer, RequestError> {
        self.begin("create", config.container_name())?;

        let mut state = self.state.lock().unwrap();
        let id = state
            .next_id
            .take()
            .unwrap_or_else(|| format!("{:0>12}", state.containers.len() + 1));
        state.created.push(config.clone());
        state
            .volume_paths
            .insert(id.clone(), config.volume_path().to_string());
        state.containers.push(engine_record(
            &id,
            config.container_name(),
            config.port().parse().unwrap_or(0),
            config.sa_password(),
            "running",
        ));

        Ok(CreatedContainer { container_id: id })
    }

    async fn start_container(&self, id: &str) -> Result<(), RequestError> {
        self.begin("start", id)?;
        self.set_status(id, "running")
    }

    async fn stop_container(&self, id: &str) -> Result<(), RequestError> {
        self.begin("stop", id)?;
        self.set_status(id, "exited")
    }

    async fn delete_container(&self, id: &str) -> Result<DeletedContainer, RequestError> {
        self.begin("delete", id)?;

        let mut state = self.state.lock().unwrap();
        let before = state.containers.len();
        state.containers.retain(|c| c.id != id);
        if state.containers.len() == before {
            return Err(not_found(id));
        }

        Ok(DeletedContainer {
            volume_path: state.volume_paths.remove(id).unwrap_or_default(),
        })
    }
}

#[derive(Default)]
struct AdminState {
    databases: HashMap<String, Vec<SqlDatabase>>,
    list_responses: VecDeque<Result<Vec<SqlDatabase>, RequestError>>,
    create_failure: Option<RequestError>,
    start_failure: Option<RequestError>,
    ready_after: Option<u32>,
    ready_calls: u32,
    calls: Vec<(String, ConnectionInfo)>,
}

/// Administration service backed by per-port database lists.
#[derive(Default)]
pub struct FakeAdmin {
    state: Mutex<AdminState>,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_databases(self, port: u16, databases: Vec<SqlDatabase>) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .insert(port.to_string(), databases);
        self
    }

    /// Answer the next list calls with these results before falling back to the stored lists.
    pub fn with_list_responses(
        self,
        responses: impl IntoIterator<Item = Result<Vec<SqlDatabase>, RequestError>>,
    ) -> Self {
        self.state.lock().unwrap().list_responses.extend(responses);
        self
    }

    /// `ready()` turns true on the `n`th call; never when unset.
    pub fn ready_after(self, n: u32) -> Self {
        self.state.lock().unwrap().ready_after = Some(n);
        self
    }

    pub fn fail_create(&self, error: RequestError) {
        self.state.lock().unwrap().create_failure = Some(error);
    }

    pub fn fail_start(&self, error: RequestError) {
        self.state.lock().unwrap().start_failure = Some(error);
    }

    pub fn calls(&self) -> Vec<(String, ConnectionInfo)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(r, _)| r == route)
            .count()
    }

    pub fn ready_calls(&self) -> u32 {
        self.state.lock().unwrap().ready_calls
    }

    fn record(&self, route: &str, info: &ConnectionInfo) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push((route.to_string(), info.clone()));
    }
}

#[async_trait]
impl AdminService for FakeAdmin {
    async fn list_databases(&self, info: &ConnectionInfo) -> Result<Vec<SqlDatabase>, RequestError> {
        self.record("listDatabases", info);
        let mut state = self.state.lock().unwrap();
        if let Some(response) = state.list_responses.pop_front() {
            return response;
        }
        Ok(state.databases.get(&info.port).cloned().unwrap_or_default())
    }

    async fn create_database(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Vec<SqlDatabase>, RequestError> {
        self.record("createDatabase", info);
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.create_failure.clone() {
            return Err(error);
        }

        let databases = state.databases.entry(info.port.clone()).or_default();
        let next_id = databases.iter().map(|d| d.id).max().unwrap_or(4) + 1;
        databases.push(database(
            info.database_name.as_deref().unwrap_or_default(),
            next_id,
        ));
        Ok(databases.clone())
    }

    async fn start_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError> {
        self.record("startConnection", info);
        match self.state.lock().unwrap().start_failure.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn stop_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError> {
        self.record("stopConnection", info);
        Ok(())
    }

    async fn ready(&self) -> Result<bool, RequestError> {
        let mut state = self.state.lock().unwrap();
        state.ready_calls += 1;
        Ok(state.ready_after.is_some_and(|n| state.ready_calls >= n))
    }
}

/// Shell executor answering scripts with canned output.
#[derive(Default)]
pub struct FakeShell {
    responses: Mutex<HashMap<String, Result<String, String>>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, script: &str, stdout: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(script.to_string(), Ok(stdout.to_string()));
        self
    }

    pub fn fail(self, script: &str, stderr: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(script.to_string(), Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, script: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == script)
            .count()
    }
}

#[async_trait]
impl ShellExecutor for FakeShell {
    async fn exec(&self, script: &str, args: &[String]) -> Result<ExecutionResult, ExecutorError> {
        self.calls
            .lock()
            .unwrap()
            .push((script.to_string(), args.to_vec()));

        match self.responses.lock().unwrap().get(script).cloned() {
            Some(Ok(stdout)) => Ok(ExecutionResult {
                stdout,
                stderr: String::new(),
                exit_code: 0,
                duration: Duration::ZERO,
            }),
            Some(Err(stderr)) => Err(ExecutorError::ExecutionFailed {
                script: script.to_string(),
                exit_code: 1,
                stderr,
            }),
            None => Err(ExecutorError::ScriptNotFound(script.to_string())),
        }
    }
}
