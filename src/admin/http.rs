//! HTTP client for the administration backend.

use super::AdminService;
use crate::error::{RequestError, ServiceError};
use crate::model::{ConnectionInfo, SqlDatabase};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Administration backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminServiceConfig {
    /// Base URL of the backend routes
    pub base_url: String,
    /// Browser URL of the interactive terminal once ready
    pub terminal_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AdminServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9080".to_string(),
            terminal_url: "http://localhost:7681/".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseList {
    // the backend encodes an empty list as null
    #[serde(default)]
    databases: Option<Vec<SqlDatabase>>,
}

impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        RequestError::Unknown(error.to_string())
    }
}

/// [`AdminService`] over the backend's JSON routes.
#[derive(Debug, Clone)]
pub struct HttpAdminService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAdminService {
    pub fn new(config: &AdminServiceConfig) -> Result<Self, RequestError> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| RequestError::unknown(format!("Invalid admin URL {}: {}", config.base_url, e)))?;
        // routes are joined relative to the base, which needs a trailing slash to keep its path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, route: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(route)
            .map_err(|e| RequestError::unknown(format!("Invalid route {}: {}", route, e)))
    }

    async fn post(&self, route: &str, info: &ConnectionInfo) -> Result<Response, RequestError> {
        debug!("POST {} (port {})", route, info.port);
        let response = self.client.post(self.endpoint(route)?).json(info).send().await?;
        check_status(response).await
    }

    async fn post_for_databases(
        &self,
        route: &str,
        info: &ConnectionInfo,
    ) -> Result<Vec<SqlDatabase>, RequestError> {
        let list: DatabaseList = self.post(route, info).await?.json().await?;
        Ok(list.databases.unwrap_or_default())
    }
}

/// Turn a non-2xx response into a structured service error.
async fn check_status(response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or("HTTP error"),
        body.trim(),
    )
    .into())
}

#[async_trait]
impl AdminService for HttpAdminService {
    async fn list_databases(&self, info: &ConnectionInfo) -> Result<Vec<SqlDatabase>, RequestError> {
        self.post_for_databases("listDatabases", info).await
    }

    async fn create_database(
        &self,
        info: &ConnectionInfo,
    ) -> Result<Vec<SqlDatabase>, RequestError> {
        self.post_for_databases("createDatabase", info).await
    }

    async fn start_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError> {
        self.post("startConnection", info).await.map(|_| ())
    }

    async fn stop_connection(&self, info: &ConnectionInfo) -> Result<(), RequestError> {
        self.post("stopConnection", info).await.map(|_| ())
    }

    async fn ready(&self) -> Result<bool, RequestError> {
        let response = self.client.get(self.endpoint("ready")?).send().await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(false);
        }

        let body = check_status(response).await?.text().await?;
        Ok(body.trim() == "true")
    }
}
