//! Integration tests for the orchestrator workflows.
//!
//! These tests drive [`App`] end-to-end through its public API: real host
//! scripts run by [`HostExecutor`], the HTTP administration client against a
//! mock server, and an in-memory container engine.

#![cfg(unix)]

use async_trait::async_trait;
use serde_json::json;
use sqlcontainers::admin::{AdminServiceConfig, HttpAdminService};
use sqlcontainers::engine::ContainerEngine;
use sqlcontainers::executor::HostExecutor;
use sqlcontainers::model::{
    ContainerConfig, CreatedContainer, DeletedContainer, EngineContainer, HostPortBinding,
    SA_PASSWORD_ENV, SQL_SERVER_PORT,
};
use sqlcontainers::session::PollConfig;
use sqlcontainers::{
    App, AppOptions, ContainerField, CreationError, RequestError, ServiceError, SessionState,
    VolumeCleanup,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Engine that keeps created containers in memory.
#[derive(Default)]
struct InMemoryEngine {
    containers: Mutex<Vec<(EngineContainer, String)>>,
}

#[async_trait]
impl ContainerEngine for InMemoryEngine {
    async fn list_containers(&self) -> Result<Vec<EngineContainer>, RequestError> {
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<CreatedContainer, RequestError> {
        let mut containers = self.containers.lock().unwrap();
        if containers
            .iter()
            .any(|(c, _)| c.name == format!("/{}", config.container_name()))
        {
            return Err(ServiceError::new(409, "Conflict", "container name already in use").into());
        }

        let id = format!("{:0>64}", containers.len() + 1);
        let record = EngineContainer {
            id: id.clone(),
            name: format!("/{}", config.container_name()),
            image: config.image().to_string(),
            port_bindings: HashMap::from([(
                SQL_SERVER_PORT.to_string(),
                vec![HostPortBinding {
                    host_ip: "0.0.0.0".to_string(),
                    host_port: config.port().to_string(),
                }],
            )]),
            env: vec![format!("{}={}", SA_PASSWORD_ENV, config.sa_password())],
            status: "running".to_string(),
        };
        containers.push((record, config.volume_path().to_string()));
        Ok(CreatedContainer { container_id: id })
    }

    async fn start_container(&self, id: &str) -> Result<(), RequestError> {
        self.set_status(id, "running")
    }

    async fn stop_container(&self, id: &str) -> Result<(), RequestError> {
        self.set_status(id, "exited")
    }

    async fn delete_container(&self, id: &str) -> Result<DeletedContainer, RequestError> {
        let mut containers = self.containers.lock().unwrap();
        let index = containers
            .iter()
            .position(|(c, _)| c.id == id)
            .ok_or_else(|| ServiceError::new(404, "Not Found", "No such container"))?;
        let (_, volume_path) = containers.remove(index);
        Ok(DeletedContainer { volume_path })
    }
}

impl InMemoryEngine {
    fn set_status(&self, id: &str, status: &str) -> Result<(), RequestError> {
        let mut containers = self.containers.lock().unwrap();
        let (container, _) = containers
            .iter_mut()
            .find(|(c, _)| c.id == id)
            .ok_or_else(|| ServiceError::new(404, "Not Found", "No such container"))?;
        container.status = status.to_string();
        Ok(())
    }
}

/// Helper scripts that create volume folders under `root`, suffixed with the
/// number of folders already there.
fn write_scripts(scripts_dir: &Path, root: &Path) {
    let root = root.display();
    fs::write(
        scripts_dir.join("createVolumeFolder.sh"),
        format!(
            "#!/bin/sh\nset -e\nn=$(ls \"{root}\" | wc -l | tr -d ' ')\nfolder=\"{root}/$1-$n\"\nmkdir -p \"$folder\"\necho \"$folder\"\n"
        ),
    )
    .unwrap();
    fs::write(
        scripts_dir.join("deleteVolumeFolder.sh"),
        "#!/bin/sh\nset -e\nrm -rf \"$1\"\n",
    )
    .unwrap();
}

async fn mock_admin(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/listDatabases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [{"name": "master", "id": 1}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/createDatabase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "databases": [{"name": "master", "id": 1}, {"name": "sales", "id": 5}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/startConnection"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/stopConnection"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(server)
        .await;
}

struct Workspace {
    _scripts: TempDir,
    volumes: TempDir,
    app: App,
}

async fn workspace(server: &MockServer) -> Workspace {
    let scripts = TempDir::new().unwrap();
    let volumes = TempDir::new().unwrap();
    write_scripts(scripts.path(), volumes.path());

    let admin = HttpAdminService::new(&AdminServiceConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    })
    .unwrap();
    let options = AppOptions {
        session_poll: PollConfig::from_millis(50, 10),
        database_retry: PollConfig::from_millis(50, 3),
        ..Default::default()
    };

    let app = App::new(
        Arc::new(InMemoryEngine::default()),
        Arc::new(admin),
        Arc::new(HostExecutor::new().with_scripts_dir(scripts.path())),
        options,
    );

    Workspace {
        _scripts: scripts,
        volumes,
        app,
    }
}

fn fill_draft(app: &mut App, name: &str, port: &str) {
    app.edit_draft(ContainerField::Image, "mcr.microsoft.com/mssql/server:2022-latest");
    app.edit_draft(ContainerField::ContainerName, name);
    app.edit_draft(ContainerField::Port, port);
    app.generate_password();
}

#[tokio::test]
async fn test_full_container_workflow() {
    let server = MockServer::start().await;
    mock_admin(&server).await;
    let mut ws = workspace(&server).await;
    let volume = ws.volumes.path().join("demo1-0");

    fill_draft(&mut ws.app, "demo1", "51433");
    let created = ws.app.create_container().await.unwrap();

    assert!(volume.is_dir());
    let container = ws.app.container(&created.container_id).unwrap().clone();
    assert_eq!(container.name, "demo1");
    assert_eq!(container.port, 51433);
    assert!(ws.app.port_in_use(51433));

    let databases = ws.app.refresh_databases(&container.id).await.unwrap().to_vec();
    assert_eq!(databases.len(), 1);

    let databases = ws.app.create_database(&container.id, "sales").await.unwrap().to_vec();
    assert_eq!(databases.len(), 2);
    assert_eq!(ws.app.container(&container.id).unwrap().databases, databases);

    ws.app.open_session(&container.id, "sales").await.unwrap();
    assert_eq!(ws.app.wait_for_session(&container.id).await, SessionState::Ready);

    let report = ws.app.delete_container(&container.id, true).await.unwrap();
    assert!(matches!(report.volume_cleanup, VolumeCleanup::Removed));
    assert_eq!(report.volume_path, volume.display().to_string());
    assert!(!volume.exists());
    assert!(ws.app.containers().is_empty());
    assert!(ws.app.database_index().is_empty());
    assert_eq!(ws.app.session_state(&container.id), SessionState::Closed);

    let stops = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/stopConnection")
        .count();
    assert_eq!(stops, 1);
}

#[tokio::test]
async fn test_rejected_create_keeps_folder_and_state() {
    let server = MockServer::start().await;
    mock_admin(&server).await;
    let mut ws = workspace(&server).await;

    fill_draft(&mut ws.app, "demo1", "51433");
    ws.app.create_container().await.unwrap();

    fill_draft(&mut ws.app, "demo1", "51434");
    let err = ws.app.create_container().await.unwrap_err();

    assert!(matches!(err, CreationError::EngineRejected { status_code: 409, .. }));
    assert_eq!(ws.app.containers().len(), 1);
    assert!(ws.app.draft().is_none());
    assert!(matches!(ws.app.last_creation(), Some(Err(_))));

    // the rejected attempt's folder is left behind
    assert!(ws.volumes.path().join("demo1-0").is_dir());
    assert!(ws.volumes.path().join("demo1-1").is_dir());
}

#[tokio::test]
async fn test_delete_keeping_data() {
    let server = MockServer::start().await;
    mock_admin(&server).await;
    let mut ws = workspace(&server).await;

    fill_draft(&mut ws.app, "demo2", "51435");
    let created = ws.app.create_container().await.unwrap();

    ws.app.stop_container(&created.container_id).await.unwrap();
    assert!(!ws.app.containers()[0].is_running());
    assert!(!ws.app.port_in_use(51435));

    let report = ws.app.delete_container(&created.container_id, false).await.unwrap();
    assert!(matches!(report.volume_cleanup, VolumeCleanup::Skipped));
    assert!(Path::new(&report.volume_path).is_dir());
}
