//! Tab contents as [`Panel`]s. HTML is produced separately in [`crate::html`].

use std::path::Path;

use factory_core::{
    Block, Bound, CapabilityRegistry, MemoryStore, Orchestrator, Panel, ProcessResult,
    RenderContext, Session, WorkflowClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Create,
    Knowledge,
    DataHub,
    Workflows,
    System,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Create,
        Tab::Knowledge,
        Tab::DataHub,
        Tab::Workflows,
        Tab::System,
    ];

    /// Unknown names fall back to the dashboard.
    pub fn from_param(param: Option<&str>) -> Self {
        Tab::ALL
            .into_iter()
            .find(|t| Some(t.slug()) == param)
            .unwrap_or(Tab::Dashboard)
    }

    pub fn slug(self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Create => "create",
            Tab::Knowledge => "knowledge",
            Tab::DataHub => "hub",
            Tab::Workflows => "workflows",
            Tab::System => "system",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "📊 Dashboard",
            Tab::Create => "🛠️ Create Code & Project",
            Tab::Knowledge => "📚 Knowledge Base",
            Tab::DataHub => "🌐 Universal Data Hub",
            Tab::Workflows => "🔄 Workflows",
            Tab::System => "⚙️ System Management",
        }
    }
}

/// Input forms the HTML layer draws above a tab's panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
    Create,
    Search { query: String },
    AddKnowledge,
}

pub struct TabView {
    pub forms: Vec<Form>,
    pub panel: Panel,
}

impl TabView {
    fn panel(panel: Panel) -> Self {
        Self {
            forms: Vec::new(),
            panel,
        }
    }
}

/// Inline error for a collaborator running as its stand-in.
fn degraded_notice<T: ?Sized>(panel: Panel, bound: &Bound<T>, what: &str) -> Panel {
    match bound.fallback_reason() {
        Some(reason) => panel.error(format!("{} unavailable: {}", what, reason)),
        None => panel,
    }
}

pub fn dashboard_tab(memory: &Bound<dyn MemoryStore>) -> TabView {
    let panel = degraded_notice(Panel::new().heading("📊 Activity"), memory, "Memory system");
    let panel = match memory.get().get_statistics() {
        Ok(stats) => panel
            .metric("Code files", stats.total_code_files)
            .metric("Knowledge entries", stats.total_knowledge)
            .metric("Executions", stats.total_executions)
            .metric("Success rate", format!("{}%", stats.success_rate_percent())),
        Err(e) => panel.error(format!("Could not read statistics: {}", e)),
    };
    TabView::panel(panel)
}

pub fn create_tab(
    session: &Session,
    orchestrator: &Bound<dyn Orchestrator>,
    notice: Option<Block>,
) -> TabView {
    if !orchestrator.is_real() {
        return TabView::panel(Panel::new().warning(
            "AI orchestrator unavailable. Please enter an AI API key in the sidebar.",
        ));
    }
    let mut panel = Panel::new().heading("🛠️ Create Code & Project");
    if let Some(notice) = notice {
        panel.push(notice);
    }
    if let Some(result) = session.last_result() {
        panel = result_blocks(panel, &result, session.package_path().is_some());
    }
    TabView {
        forms: vec![Form::Create],
        panel,
    }
}

fn result_blocks(mut panel: Panel, result: &ProcessResult, downloadable: bool) -> Panel {
    panel.push(Block::Success {
        text: format!(
            "✅ Project `{}` created ({} files).",
            result.plan.project_name,
            result.execution.created_files.len()
        ),
    });
    if downloadable {
        panel.push(Block::Download {
            label: "📦 Download project (.zip)".to_string(),
            href: "/download".to_string(),
        });
    }
    for path in result.execution.created_files.iter().filter(|p| p.is_file()) {
        let body = match std::fs::read_to_string(path) {
            Ok(text) => Block::Code {
                language: language_of(path),
                text,
            },
            Err(e) => Block::Error {
                text: format!("Could not read {}: {}", file_name(path), e),
            },
        };
        panel.push(Block::Expander {
            title: format!("📄 {}", file_name(path)),
            body: vec![body],
        });
    }
    panel
}

/// Basename only; server paths stay out of the page.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn language_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().into_owned())
}

pub fn knowledge_tab(memory: &Bound<dyn MemoryStore>, query: &str, notice: Option<Block>) -> TabView {
    let mut panel = degraded_notice(Panel::new().heading("📚 Knowledge Base"), memory, "Memory system");
    if let Some(notice) = notice {
        panel.push(notice);
    }
    let query = query.trim();
    if !query.is_empty() {
        panel = match memory.get().search_knowledge(query) {
            Ok(hits) if hits.is_empty() => panel.info(format!("No knowledge found for `{}`.", query)),
            Ok(hits) => hits.into_iter().fold(panel, |p, hit| {
                p.with(Block::Expander {
                    title: hit.topic,
                    body: vec![Block::Markdown { text: hit.content }],
                })
            }),
            Err(e) => panel.error(format!("Search failed: {}", e)),
        };
    }
    TabView {
        forms: vec![
            Form::Search {
                query: query.to_string(),
            },
            Form::AddKnowledge,
        ],
        panel,
    }
}

pub fn data_hub_tab(registry: &CapabilityRegistry, ctx: &RenderContext) -> TabView {
    TabView::panel(registry.data_hub_tab().render(ctx))
}

pub fn system_tab(registry: &CapabilityRegistry, ctx: &RenderContext) -> TabView {
    TabView::panel(registry.system_management_tab().render(ctx))
}

pub async fn workflows_tab(client: &Bound<dyn WorkflowClient>) -> TabView {
    let mut panel = degraded_notice(Panel::new().heading("🔄 Workflows"), client, "Workflow client");
    let n8n = client.get();
    if !n8n.test_connection().await {
        return TabView::panel(panel.warning(format!(
            "n8n is not connected ({}). Set N8N_BASE_URL and N8N_API_KEY.",
            n8n.base_url()
        )));
    }
    panel.push(Block::Success {
        text: format!("Connected to n8n at {}", n8n.base_url()),
    });
    panel = match n8n.get_workflow_statistics().await {
        Ok(stats) => panel
            .metric("Workflows", stats.total_workflows)
            .metric("Active workflows", stats.active_workflows),
        Err(e) => panel.error(format!("Could not load workflow statistics: {}", e)),
    };
    panel = match n8n.get_execution_statistics().await {
        Ok(stats) => panel
            .metric("Executions", stats.total_executions)
            .metric("Successful", stats.successful),
        Err(e) => panel.error(format!("Could not load execution statistics: {}", e)),
    };
    panel = match n8n.get_workflows().await {
        Ok(workflows) if workflows.is_empty() => panel.info("No workflows defined yet."),
        Ok(workflows) => {
            let list = workflows
                .iter()
                .map(|w| {
                    let state = if w.active { "active" } else { "inactive" };
                    format!("- {} ({})", w.name, state)
                })
                .collect::<Vec<_>>()
                .join("\n");
            panel.with(Block::Markdown { text: list })
        }
        Err(e) => panel.error(format!("Could not list workflows: {}", e)),
    };
    TabView::panel(panel)
}

/// Sidebar notices: API key state and the persistent degraded-mode warning.
pub fn sidebar(registry: &CapabilityRegistry, session: &Session) -> Panel {
    let mut panel = Panel::new().heading("🏭 AI Factory");
    panel = if session.has_api_key() {
        panel.success("AI API key set for this session.")
    } else {
        panel.info("No AI API key set.")
    };
    if registry.is_degraded() {
        panel = panel.warning(
            "⚠️ Universal Data Hub module could not be loaded. Running in degraded mode.",
        );
        if let Some(report) = registry.report() {
            let tried = report
                .attempts
                .iter()
                .map(|a| Block::Text {
                    text: format!("{}: {}", a.strategy, a.error),
                })
                .collect();
            panel.push(Block::Expander {
                title: "Resolution attempts".to_string(),
                body: tried,
            });
        }
    }
    panel
}
