//! AI request orchestrator: turns a project description into files on disk and a zip package.
//!
//! The model is asked (OpenAI-compatible chat completions) for a JSON project
//! `{project_name, files: [{path, content}]}`; the reply is written under
//! `<output_dir>/<project-slug>/` and zipped next to it. Planning quality is the model's business.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facade::Bound;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a software project generator. \
    Reply with a single JSON object and nothing else: \
    {\"project_name\": string, \"files\": [{\"path\": relative path, \"content\": file content}]}. \
    Paths must be relative and must not contain '..'.";

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("AI orchestrator unavailable: {0}")]
    Unavailable(String),
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request description is empty")]
    EmptyRequest,
    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI reply is not a valid project: {0}")]
    InvalidProject(String),
    #[error("unsafe file path in project: {0}")]
    UnsafePath(String),
    #[error("failed to write project: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to package project: {0}")]
    Package(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub project_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    #[serde(default)]
    pub created_files: Vec<PathBuf>,
}

/// Result of one `process_request` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub plan: Plan,
    pub execution: ExecutionOutcome,
    #[serde(default)]
    pub package: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProject {
    pub project_name: String,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
}

#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn process_request(&self, description: &str) -> Result<ProcessResult, OrchestratorError>;
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub api_base: String,
    pub model: String,
    pub output_dir: PathBuf,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

pub struct LlmOrchestrator {
    api_key: String,
    settings: OrchestratorSettings,
    client: reqwest::Client,
}

impl LlmOrchestrator {
    pub fn new(api_key: &str, settings: OrchestratorSettings) -> Result<Self, OrchestratorError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(OrchestratorError::MissingApiKey);
        }
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_key: api_key.to_string(),
            settings,
            client,
        })
    }

    async fn generate(&self, description: &str) -> Result<GeneratedProject, OrchestratorError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        );
        let body = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: description.to_string(),
                },
            ],
            temperature: 0.2,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(OrchestratorError::Api { status, body });
        }
        let parsed: ChatResponse = res.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OrchestratorError::InvalidProject("empty reply".to_string()))?;
        parse_project(&text)
    }
}

#[async_trait]
impl Orchestrator for LlmOrchestrator {
    async fn process_request(&self, description: &str) -> Result<ProcessResult, OrchestratorError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(OrchestratorError::EmptyRequest);
        }
        let project = self.generate(description).await?;
        tracing::info!(
            "Orchestrator: materializing `{}` ({} files)",
            project.project_name,
            project.files.len()
        );
        let output_dir = self.settings.output_dir.clone();
        tokio::task::spawn_blocking(move || materialize(&project, &output_dir))
            .await
            .map_err(|e| OrchestratorError::Io(std::io::Error::other(e.to_string())))?
    }
}

/// Stand-in when no orchestrator can be built. Every request reports the reason.
pub struct UnavailableOrchestrator {
    reason: String,
}

impl UnavailableOrchestrator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Orchestrator for UnavailableOrchestrator {
    async fn process_request(&self, _description: &str) -> Result<ProcessResult, OrchestratorError> {
        Err(OrchestratorError::Unavailable(self.reason.clone()))
    }
}

/// Real orchestrator when an API key is present and the client builds.
pub fn connect_orchestrator(
    api_key: Option<&str>,
    settings: &OrchestratorSettings,
) -> Bound<dyn Orchestrator> {
    let built = match api_key {
        Some(key) => LlmOrchestrator::new(key, settings.clone()),
        None => Err(OrchestratorError::MissingApiKey),
    };
    match built {
        Ok(orchestrator) => Bound::real(Arc::new(orchestrator) as Arc<dyn Orchestrator>),
        Err(e) => {
            let reason = e.to_string();
            tracing::debug!("Orchestrator unavailable: {}", reason);
            Bound::fallback(
                Arc::new(UnavailableOrchestrator::new(reason.clone())) as Arc<dyn Orchestrator>,
                reason,
            )
        }
    }
}

/// Parse the model reply, tolerating code fences or prose around the JSON object.
pub fn parse_project(reply: &str) -> Result<GeneratedProject, OrchestratorError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &reply[s..=e],
        _ => return Err(OrchestratorError::InvalidProject("no JSON object".to_string())),
    };
    let project: GeneratedProject = serde_json::from_str(json)
        .map_err(|e| OrchestratorError::InvalidProject(e.to_string()))?;
    if project.project_name.trim().is_empty() {
        return Err(OrchestratorError::InvalidProject(
            "missing project_name".to_string(),
        ));
    }
    Ok(project)
}

/// Lowercase ASCII slug; `project` when nothing usable remains.
pub fn project_slug(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

fn safe_relative(path: &str) -> Result<PathBuf, OrchestratorError> {
    let p = Path::new(path);
    let ok = !path.trim().is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(p.to_path_buf())
    } else {
        Err(OrchestratorError::UnsafePath(path.to_string()))
    }
}

/// `<slug>-<8 hex>`: one directory and package per request, even for repeated names.
fn unique_root_name(project_name: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", project_slug(project_name), &id[..8])
}

/// Write the project files and the zip package under a fresh `<slug>-<id>` root.
pub fn materialize(
    project: &GeneratedProject,
    output_dir: &Path,
) -> Result<ProcessResult, OrchestratorError> {
    let relative: Vec<PathBuf> = project
        .files
        .iter()
        .map(|f| safe_relative(&f.path))
        .collect::<Result<_, _>>()?;

    let root_name = unique_root_name(&project.project_name);
    let root = output_dir.join(&root_name);
    fs::create_dir_all(&root)?;

    let mut created = Vec::with_capacity(project.files.len());
    for (file, rel) in project.files.iter().zip(&relative) {
        let target = root.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.content)?;
        created.push(target);
    }

    let package = output_dir.join(format!("{}.zip", root_name));
    let mut zip = zip::ZipWriter::new(File::create(&package)?);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (file, rel) in project.files.iter().zip(&relative) {
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(format!("{}/{}", root_name, name), options)?;
        zip.write_all(file.content.as_bytes())?;
    }
    zip.finish()?;

    Ok(ProcessResult {
        plan: Plan {
            project_name: project.project_name.clone(),
        },
        execution: ExecutionOutcome {
            created_files: created,
        },
        package: Some(package),
    })
}
