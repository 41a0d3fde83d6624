//! Per-session collaborator slots and the create-project flow.
//!
//! Each browser session owns one `Session`. Memory and workflow slots are
//! filled on first use and never change; the orchestrator slot is cleared
//! whenever the session's API key changes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::capability::HubWriter;
use crate::config::{FactoryConfig, Secrets, WorkflowSettings, AI_API_KEY_KEY};
use crate::facade::Bound;
use crate::memory::{ExecutionStatus, MemoryStore, SledMemory, UnavailableMemory};
use crate::orchestrator::{connect_orchestrator, Orchestrator, OrchestratorError, OrchestratorSettings, ProcessResult};
use crate::workflow::{connect_workflow_client, WorkflowClient};

pub const PLAN_CATEGORY: &str = "Research";
pub const SOURCE_CATEGORY: &str = "Source Code";

/// Builds the facade collaborators a session uses.
pub trait Collaborators: Send + Sync {
    fn orchestrator(&self, api_key: Option<&str>) -> Bound<dyn Orchestrator>;
    fn memory(&self) -> Bound<dyn MemoryStore>;
    fn workflow_client(&self) -> Bound<dyn WorkflowClient>;
    /// API key a fresh session starts with.
    fn default_api_key(&self) -> Option<String> {
        None
    }
}

/// Collaborators backed by configuration and secrets.
pub struct LiveCollaborators {
    config: FactoryConfig,
    secrets: Secrets,
    memory_db: OnceLock<Result<sled::Db, String>>,
}

impl LiveCollaborators {
    pub fn new(config: FactoryConfig, secrets: Secrets) -> Self {
        Self {
            config,
            secrets,
            memory_db: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            api_base: self.config.llm_api_base.clone(),
            model: self.config.llm_model.clone(),
            output_dir: self.config.output_dir(),
        }
    }

    /// sled allows one open handle per path and process; every session shares it.
    fn memory_db(&self) -> Result<&sled::Db, &str> {
        self.memory_db
            .get_or_init(|| {
                let path = self.config.memory_path();
                sled::open(&path).map_err(|e| {
                    tracing::warn!("Memory store {} unavailable: {}", path.display(), e);
                    e.to_string()
                })
            })
            .as_ref()
            .map_err(String::as_str)
    }
}

impl Collaborators for LiveCollaborators {
    fn orchestrator(&self, api_key: Option<&str>) -> Bound<dyn Orchestrator> {
        connect_orchestrator(api_key, &self.orchestrator_settings())
    }

    fn memory(&self) -> Bound<dyn MemoryStore> {
        let opened = self
            .memory_db()
            .map_err(str::to_string)
            .and_then(|db| SledMemory::from_db(db).map_err(|e| e.to_string()));
        match opened {
            Ok(memory) => Bound::real(Arc::new(memory) as Arc<dyn MemoryStore>),
            Err(reason) => Bound::fallback(Arc::new(UnavailableMemory) as Arc<dyn MemoryStore>, reason),
        }
    }

    fn workflow_client(&self) -> Bound<dyn WorkflowClient> {
        connect_workflow_client(&WorkflowSettings::from_secrets(&self.secrets))
    }

    fn default_api_key(&self) -> Option<String> {
        self.secrets.get(AI_API_KEY_KEY)
    }
}

#[derive(Default)]
pub struct Session {
    api_key: RwLock<Option<String>>,
    orchestrator: RwLock<Option<Bound<dyn Orchestrator>>>,
    memory: OnceLock<Bound<dyn MemoryStore>>,
    workflow: OnceLock<Bound<dyn WorkflowClient>>,
    last_result: RwLock<Option<ProcessResult>>,
}

impl Session {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: RwLock::new(normalize_key(api_key.as_deref())),
            ..Self::default()
        }
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Store a new key (blank clears it) and drop the cached orchestrator.
    pub fn set_api_key(&self, key: &str) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = normalize_key(Some(key));
        *self
            .orchestrator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn orchestrator(&self, collaborators: &dyn Collaborators) -> Bound<dyn Orchestrator> {
        if let Some(bound) = self
            .orchestrator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return bound.clone();
        }
        let mut slot = self
            .orchestrator
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| collaborators.orchestrator(self.api_key().as_deref()))
            .clone()
    }

    pub fn memory(&self, collaborators: &dyn Collaborators) -> Bound<dyn MemoryStore> {
        self.memory.get_or_init(|| collaborators.memory()).clone()
    }

    pub fn workflow_client(&self, collaborators: &dyn Collaborators) -> Bound<dyn WorkflowClient> {
        self.workflow
            .get_or_init(|| collaborators.workflow_client())
            .clone()
    }

    pub fn last_result(&self) -> Option<ProcessResult> {
        self.last_result
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_result(&self, result: ProcessResult) {
        *self
            .last_result
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    /// Package path of the cached result, when it exists on disk.
    pub fn package_path(&self) -> Option<PathBuf> {
        self.last_result()
            .and_then(|r| r.package)
            .filter(|p| p.is_file())
    }

    /// Run one create-project request: orchestrate, record in hub and memory, cache.
    ///
    /// Failures are recorded as a failed execution and returned; earlier cached
    /// state is kept.
    pub async fn submit_request(
        &self,
        collaborators: &dyn Collaborators,
        hub: &dyn HubWriter,
        description: &str,
    ) -> Result<ProcessResult, OrchestratorError> {
        let orchestrator = self.orchestrator(collaborators);
        if let Some(reason) = orchestrator.fallback_reason() {
            return Err(OrchestratorError::Unavailable(reason.to_string()));
        }
        let memory = self.memory(collaborators);

        let result = match orchestrator.get().process_request(description).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Create request failed: {}", e);
                memory
                    .get()
                    .record_execution(description, ExecutionStatus::Failed);
                return Err(e);
            }
        };

        hub.add_to_hub(
            &format!("Plan: {}", result.plan.project_name),
            &format!("Request from user: {}", description),
            PLAN_CATEGORY,
        );
        for path in result.execution.created_files.iter().filter(|p| p.is_file()) {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    hub.add_to_hub(
                        &format!("File: {}", file_name(path)),
                        &fenced(path, &content),
                        SOURCE_CATEGORY,
                    );
                }
                Err(e) => tracing::debug!("Skipping hub copy of {}: {}", path.display(), e),
            }
            memory.get().record_code_file(path);
        }
        memory
            .get()
            .record_execution(description, ExecutionStatus::Success);

        tracing::info!(
            "Created project `{}` ({} files)",
            result.plan.project_name,
            result.execution.created_files.len()
        );
        self.store_result(result.clone());
        Ok(result)
    }
}

fn normalize_key(key: Option<&str>) -> Option<String> {
    key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn fenced(path: &Path, content: &str) -> String {
    let language = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("```{}\n{}\n```", language, content)
}
