//! Stand-ins bound when the tab extension cannot be loaded.

use crate::capability::{HubWriter, RenderContext, TabRenderer};
use crate::environment::EnvInfo;
use crate::ui::{Block, Panel};

/// Query parameter the diagnostics toggle sets.
pub const DIAGNOSTICS_PARAM: &str = "diagnostics";

/// Data hub tab without an extension: error notice, plus the environment snapshot on opt-in.
pub struct FallbackDataHubTab {
    module: String,
    env: EnvInfo,
}

impl FallbackDataHubTab {
    pub fn new(module: impl Into<String>, env: EnvInfo) -> Self {
        Self {
            module: module.into(),
            env,
        }
    }
}

impl TabRenderer for FallbackDataHubTab {
    fn render(&self, ctx: &RenderContext) -> Panel {
        let panel = Panel::new().error(format!(
            "⚠️ Tab load error: module `{}` not found.",
            self.module
        ));
        if !ctx.show_diagnostics {
            return panel.with(Block::Toggle {
                label: "Show diagnostic information".to_string(),
                param: DIAGNOSTICS_PARAM.to_string(),
            });
        }
        let value = serde_json::to_value(&self.env).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() })
        });
        panel.with(Block::Json { value })
    }
}

pub struct FallbackSystemManagementTab;

impl TabRenderer for FallbackSystemManagementTab {
    fn render(&self, _ctx: &RenderContext) -> Panel {
        Panel::new().error("System management tab unavailable.")
    }
}

/// `add_to_hub` without an extension: accepts anything, stores nothing.
pub struct FallbackHubWriter;

impl HubWriter for FallbackHubWriter {
    fn add_to_hub(&self, _title: &str, _content: &str, _category: &str) -> bool {
        false
    }
}
