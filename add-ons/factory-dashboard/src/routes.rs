//! HTTP surface: one page with six tabs plus the form endpoints.

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use factory_core::{Block, RenderContext, Session};
use serde::Deserialize;

use crate::html;
use crate::state::AppState;
use crate::views::{self, Tab};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    tab: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    diagnostics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeForm {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    api_key: String,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/create", post(create))
        .route("/knowledge", post(add_knowledge))
        .route("/session/key", post(set_api_key))
        .route("/download", get(download))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn opted_in(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "on" | "yes"))
}

async fn render_tab(
    state: &AppState,
    session: &Session,
    tab: Tab,
    ctx: &RenderContext,
    query: &str,
    notice: Option<Block>,
) -> String {
    let collaborators = state.collaborators.as_ref();
    let view = match tab {
        Tab::Dashboard => views::dashboard_tab(&session.memory(collaborators)),
        Tab::Create => views::create_tab(session, &session.orchestrator(collaborators), notice),
        Tab::Knowledge => views::knowledge_tab(&session.memory(collaborators), query, notice),
        Tab::DataHub => views::data_hub_tab(&state.registry, ctx),
        Tab::Workflows => views::workflows_tab(&session.workflow_client(collaborators)).await,
        Tab::System => views::system_tab(&state.registry, ctx),
    };
    html::page(tab, &views::sidebar(&state.registry, session), &view)
}

/// GET /?tab=&q=&diagnostics=
async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let handle = state.session(&headers);
    let tab = Tab::from_param(query.tab.as_deref());
    let ctx = RenderContext {
        show_diagnostics: opted_in(query.diagnostics.as_deref()),
    };
    let page = render_tab(
        &state,
        &handle.session,
        tab,
        &ctx,
        query.q.as_deref().unwrap_or_default(),
        None,
    )
    .await;
    (handle.headers(), Html(page))
}

/// POST /create: ignored while the orchestrator is unavailable.
async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CreateForm>,
) -> impl IntoResponse {
    let handle = state.session(&headers);
    let session = &handle.session;
    let collaborators = state.collaborators.as_ref();

    let notice = if !session.orchestrator(collaborators).is_real() {
        tracing::debug!("Create request ignored: orchestrator unavailable");
        None
    } else if form.description.trim().is_empty() {
        Some(Block::Warning {
            text: "Please describe what you want to build.".to_string(),
        })
    } else {
        let hub = state.registry.hub_writer();
        match session
            .submit_request(collaborators, hub.as_ref(), form.description.trim())
            .await
        {
            Ok(_) => None,
            Err(e) => Some(Block::Error {
                text: format!("❌ Request failed: {}", e),
            }),
        }
    };

    let page = render_tab(&state, session, Tab::Create, &RenderContext::default(), "", notice).await;
    (handle.headers(), Html(page))
}

/// POST /knowledge
async fn add_knowledge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<KnowledgeForm>,
) -> impl IntoResponse {
    let handle = state.session(&headers);
    let memory = handle.session.memory(state.collaborators.as_ref());
    let topic = form.topic.trim();
    let notice = if topic.is_empty() || form.content.trim().is_empty() {
        Block::Warning {
            text: "Topic and content are both required.".to_string(),
        }
    } else if memory.get().add_knowledge(topic, form.content.trim()) {
        Block::Success {
            text: format!("Saved knowledge on `{}`.", topic),
        }
    } else {
        Block::Error {
            text: "Knowledge could not be saved.".to_string(),
        }
    };
    let page = render_tab(
        &state,
        &handle.session,
        Tab::Knowledge,
        &RenderContext::default(),
        "",
        Some(notice),
    )
    .await;
    (handle.headers(), Html(page))
}

/// POST /session/key: replaces this session's key and drops its orchestrator.
async fn set_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ApiKeyForm>,
) -> impl IntoResponse {
    let handle = state.session(&headers);
    handle.session.set_api_key(&form.api_key);
    tracing::info!(
        "Session API key {}",
        if handle.session.has_api_key() { "updated" } else { "cleared" }
    );
    (handle.headers(), Redirect::to(&format!("/?tab={}", Tab::Create.slug())))
}

/// GET /download: the package of this session's last project, nothing else.
async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = state
        .existing_session(&headers)
        .and_then(|session| session.package_path())
        .ok_or((
            StatusCode::NOT_FOUND,
            "No project package for this session".to_string(),
        ))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut out = HeaderMap::new();
    out.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project.zip".to_string());
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        out.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((out, bytes))
}
