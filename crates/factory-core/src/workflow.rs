//! Workflow-automation (n8n) client and its offline stand-in.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::WorkflowSettings;
use crate::facade::Bound;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const EXECUTION_PAGE_LIMIT: u32 = 100;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("invalid n8n base url `{0}`")]
    InvalidUrl(String),
    #[error("n8n request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("n8n returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatistics {
    pub total_workflows: usize,
    pub active_workflows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    pub total_executions: usize,
    pub successful: usize,
    #[serde(default)]
    pub executions: Vec<Execution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<serde_json::Value>,
    #[serde(default)]
    pub started_at: Option<String>,
}

impl Execution {
    /// Newer n8n versions report `status`; older ones only `finished`.
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => status == "success",
            None => self.finished,
        }
    }
}

fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

#[async_trait]
pub trait WorkflowClient: Send + Sync {
    fn base_url(&self) -> &str;
    async fn test_connection(&self) -> bool;
    async fn get_workflow_statistics(&self) -> Result<WorkflowStatistics, WorkflowError>;
    async fn get_execution_statistics(&self) -> Result<ExecutionStatistics, WorkflowError>;
    async fn get_workflows(&self) -> Result<Vec<Workflow>, WorkflowError>;
}

/// n8n public REST API client (`/api/v1`, `X-N8N-API-KEY` auth).
pub struct N8nClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl N8nClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, WorkflowError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|_| WorkflowError::InvalidUrl(base_url.clone()))?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        limit: u32,
    ) -> Result<Vec<T>, WorkflowError> {
        let url = format!("{}/api/v1/{}", self.base_url, path);
        let mut req = self.client.get(&url).query(&[("limit", limit)]);
        if let Some(key) = &self.api_key {
            req = req.header("X-N8N-API-KEY", key);
        }
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(WorkflowError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let page: Page<T> = res.json().await?;
        Ok(page.data)
    }
}

#[async_trait]
impl WorkflowClient for N8nClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn test_connection(&self) -> bool {
        match self.get_page::<serde_json::Value>("workflows", 1).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("n8n connection test against {} failed: {}", self.base_url, e);
                false
            }
        }
    }

    async fn get_workflow_statistics(&self) -> Result<WorkflowStatistics, WorkflowError> {
        let workflows = self.get_workflows().await?;
        Ok(WorkflowStatistics {
            total_workflows: workflows.len(),
            active_workflows: workflows.iter().filter(|w| w.active).count(),
        })
    }

    async fn get_execution_statistics(&self) -> Result<ExecutionStatistics, WorkflowError> {
        let executions: Vec<Execution> = self.get_page("executions", EXECUTION_PAGE_LIMIT).await?;
        Ok(ExecutionStatistics {
            total_executions: executions.len(),
            successful: executions.iter().filter(|e| e.succeeded()).count(),
            executions,
        })
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, WorkflowError> {
        self.get_page("workflows", 250).await
    }
}

/// Stand-in used when the real client is unavailable. Reports "not connected" and empty data.
/// Accepts any settings; only the base URL is kept, for display.
pub struct OfflineWorkflowClient {
    base_url: String,
}

impl OfflineWorkflowClient {
    pub fn new(settings: &WorkflowSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
        }
    }
}

#[async_trait]
impl WorkflowClient for OfflineWorkflowClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn test_connection(&self) -> bool {
        false
    }

    async fn get_workflow_statistics(&self) -> Result<WorkflowStatistics, WorkflowError> {
        Ok(WorkflowStatistics::default())
    }

    async fn get_execution_statistics(&self) -> Result<ExecutionStatistics, WorkflowError> {
        Ok(ExecutionStatistics::default())
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, WorkflowError> {
        Ok(Vec::new())
    }
}

/// Real client when it can be built, offline stand-in otherwise.
pub fn connect_workflow_client(settings: &WorkflowSettings) -> Bound<dyn WorkflowClient> {
    match build_real_client(settings) {
        Ok(client) => Bound::real(client),
        Err(reason) => {
            tracing::warn!("Workflow client unavailable ({}); using offline client", reason);
            let offline = OfflineWorkflowClient::new(settings);
            Bound::fallback(Arc::new(offline) as Arc<dyn WorkflowClient>, reason)
        }
    }
}

#[cfg(feature = "n8n")]
fn build_real_client(settings: &WorkflowSettings) -> Result<Arc<dyn WorkflowClient>, String> {
    N8nClient::new(&settings.base_url, settings.api_key.clone())
        .map(|client| Arc::new(client) as Arc<dyn WorkflowClient>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "n8n"))]
fn build_real_client(_settings: &WorkflowSettings) -> Result<Arc<dyn WorkflowClient>, String> {
    Err("n8n support not compiled in".to_string())
}
