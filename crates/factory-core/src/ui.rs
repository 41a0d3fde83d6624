//! Rendered tab output: an ordered list of blocks the dashboard turns into HTML.
//!
//! Panels cross the dynamic-library boundary as JSON, so every block is plain serde data.

use serde::{Deserialize, Serialize};

/// One UI element of a rendered tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Text { text: String },
    Markdown { text: String },
    Info { text: String },
    Success { text: String },
    Warning { text: String },
    Error { text: String },
    /// Labelled figure (dashboard cards, hub counters).
    Metric { label: String, value: String },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
    Json { value: serde_json::Value },
    /// Collapsible section.
    Expander { title: String, body: Vec<Block> },
    /// Opt-in control. The dashboard renders it as a link that sets `param=1` on the current tab.
    Toggle { label: String, param: String },
    Download { label: String, href: String },
}

/// A rendered tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub blocks: Vec<Block>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn with(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn heading(self, text: impl Into<String>) -> Self {
        self.with(Block::Heading { text: text.into() })
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.with(Block::Text { text: text.into() })
    }

    pub fn info(self, text: impl Into<String>) -> Self {
        self.with(Block::Info { text: text.into() })
    }

    pub fn success(self, text: impl Into<String>) -> Self {
        self.with(Block::Success { text: text.into() })
    }

    pub fn warning(self, text: impl Into<String>) -> Self {
        self.with(Block::Warning { text: text.into() })
    }

    pub fn error(self, text: impl Into<String>) -> Self {
        self.with(Block::Error { text: text.into() })
    }

    pub fn metric(self, label: impl Into<String>, value: impl ToString) -> Self {
        self.with(Block::Metric {
            label: label.into(),
            value: value.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when any top-level block is an error notice.
    pub fn has_error(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, Block::Error { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_json_is_tagged_by_kind() {
        let block = Block::Metric {
            label: "Files".into(),
            value: "3".into(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["kind"], "metric");
        assert_eq!(json["label"], "Files");
    }

    #[test]
    fn panel_parses_from_extension_payload() {
        let raw = r#"{"blocks":[{"kind":"heading","text":"Hub"},{"kind":"code","text":"fn main() {}"}]}"#;
        let panel: Panel = serde_json::from_str(raw).unwrap();
        assert_eq!(panel.blocks.len(), 2);
        assert_eq!(
            panel.blocks[1],
            Block::Code {
                language: None,
                text: "fn main() {}".into()
            }
        );
    }

    #[test]
    fn has_error_only_looks_at_error_blocks() {
        assert!(!Panel::new().warning("careful").has_error());
        assert!(Panel::new().error("broken").has_error());
    }
}
