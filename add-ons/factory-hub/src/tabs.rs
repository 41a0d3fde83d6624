//! The two tabs and the `add_to_hub` writer, all backed by one [`HubStore`].

use std::sync::Arc;

use factory_core::{Block, HubWriter, Panel, RenderContext, TabRenderer};
use sysinfo::System;

use crate::store::{HubError, HubStore};

const RECENT_ENTRIES: usize = 20;

pub struct DataHubTab {
    store: Arc<HubStore>,
}

impl DataHubTab {
    pub fn new(store: Arc<HubStore>) -> Self {
        Self { store }
    }

    fn try_render(&self) -> Result<Panel, HubError> {
        let mut panel = Panel::new()
            .heading("🌐 Universal Data Hub")
            .metric("Total entries", self.store.len());
        for (category, count) in self.store.category_counts()? {
            panel.push(Block::Metric {
                label: category,
                value: count.to_string(),
            });
        }

        let recent = self.store.list(RECENT_ENTRIES)?;
        if recent.is_empty() {
            return Ok(panel.info("The hub is empty. Created projects and their files appear here."));
        }
        panel.push(Block::Heading {
            text: "Recent entries".to_string(),
        });
        for entry in recent {
            panel.push(Block::Expander {
                title: format!("[{}] {}", entry.category, entry.title),
                body: vec![
                    Block::Markdown {
                        text: entry.content,
                    },
                    Block::Text {
                        text: format!("Added {}", entry.created_at.format("%Y-%m-%d %H:%M UTC")),
                    },
                ],
            });
        }
        Ok(panel)
    }
}

impl TabRenderer for DataHubTab {
    fn render(&self, _ctx: &RenderContext) -> Panel {
        self.try_render().unwrap_or_else(|e| {
            tracing::warn!("Data hub tab: {}", e);
            Panel::new().error(format!("Hub store error: {}", e))
        })
    }
}

pub struct SystemManagementTab {
    store: Arc<HubStore>,
}

impl SystemManagementTab {
    pub fn new(store: Arc<HubStore>) -> Self {
        Self { store }
    }

    fn try_render(&self, ctx: &RenderContext) -> Result<Panel, HubError> {
        let categories = self.store.category_counts()?;
        let mut panel = Panel::new()
            .heading("⚙️ System Management")
            .metric("Hub entries", self.store.len())
            .metric("Categories", categories.len())
            .metric("Hub size on disk", format_bytes(self.store.size_on_disk()?))
            .text(format!("Hub store: {}", self.store.path().display()));

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();
        panel = panel
            .metric(
                "Memory used",
                format!(
                    "{} / {}",
                    format_bytes(sys.used_memory()),
                    format_bytes(sys.total_memory())
                ),
            )
            .metric("CPUs", sys.cpus().len());
        if ctx.show_diagnostics {
            panel.push(Block::Json {
                value: serde_json::json!({
                    "host_name": System::host_name(),
                    "os_version": System::long_os_version(),
                    "kernel_version": System::kernel_version(),
                }),
            });
        }
        Ok(panel)
    }
}

impl TabRenderer for SystemManagementTab {
    fn render(&self, ctx: &RenderContext) -> Panel {
        self.try_render(ctx).unwrap_or_else(|e| {
            tracing::warn!("System management tab: {}", e);
            Panel::new().error(format!("Hub store error: {}", e))
        })
    }
}

pub struct StoreWriter {
    store: Arc<HubStore>,
}

impl StoreWriter {
    pub fn new(store: Arc<HubStore>) -> Self {
        Self { store }
    }
}

impl HubWriter for StoreWriter {
    fn add_to_hub(&self, title: &str, content: &str, category: &str) -> bool {
        match self.store.add(title, content, category) {
            Ok(entry) => {
                tracing::debug!("Hub: added `{}` to {}", entry.title, entry.category);
                true
            }
            Err(e) => {
                tracing::warn!("Hub: add_to_hub `{}` failed: {}", title, e);
                false
            }
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
