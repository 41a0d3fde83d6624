//! Panel -> HTML. Every user or module supplied string goes through `html_escape`.

use factory_core::{Block, Panel};

use crate::views::{Form, Tab, TabView};

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #0e1117; color: #e6e6e6; display: flex; }
aside { width: 280px; min-height: 100vh; padding: 1rem; background: #161b22; box-sizing: border-box; }
main { flex: 1; padding: 1.5rem 2rem; }
nav a { display: inline-block; margin: 0 .25rem .5rem 0; padding: .4rem .8rem; border-radius: 6px; color: #e6e6e6; text-decoration: none; background: #21262d; }
nav a.active { background: #ff4b4b; }
.notice { padding: .6rem .9rem; border-radius: 6px; margin: .5rem 0; }
.info { background: #1c3a5e; } .success { background: #1f4d2c; } .warning { background: #5c4a12; } .error { background: #5e1c1c; }
.metric { display: inline-block; min-width: 140px; margin: .5rem 1rem .5rem 0; }
.metric .value { display: block; font-size: 1.8rem; font-weight: 600; }
pre { background: #161b22; padding: .75rem; overflow-x: auto; }
.markdown { white-space: pre-wrap; }
form { margin: .75rem 0; } textarea, input[type=text], input[type=password] { width: 100%; box-sizing: border-box; margin: .25rem 0; }
"#;

/// Escapes HTML to prevent injection.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_panel(panel: &Panel, tab: Tab) -> String {
    panel.blocks.iter().map(|b| render_block(b, tab)).collect()
}

fn notice(class: &str, text: &str) -> String {
    format!(r#"<div class="notice {}">{}</div>"#, class, html_escape(text))
}

fn render_block(block: &Block, tab: Tab) -> String {
    match block {
        Block::Heading { text } => format!("<h2>{}</h2>", html_escape(text)),
        Block::Text { text } => format!("<p>{}</p>", html_escape(text)),
        Block::Markdown { text } => format!(r#"<div class="markdown">{}</div>"#, html_escape(text)),
        Block::Info { text } => notice("info", text),
        Block::Success { text } => notice("success", text),
        Block::Warning { text } => notice("warning", text),
        Block::Error { text } => notice("error", text),
        Block::Metric { label, value } => format!(
            r#"<div class="metric"><span class="label">{}</span><span class="value">{}</span></div>"#,
            html_escape(label),
            html_escape(value)
        ),
        Block::Code { language, text } => format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            html_escape(language.as_deref().unwrap_or("text")),
            html_escape(text)
        ),
        Block::Json { value } => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("<pre><code>{}</code></pre>", html_escape(&pretty))
        }
        Block::Expander { title, body } => format!(
            "<details><summary>{}</summary>{}</details>",
            html_escape(title),
            body.iter().map(|b| render_block(b, tab)).collect::<String>()
        ),
        Block::Toggle { label, param } => format!(
            r#"<p><a href="/?tab={}&amp;{}=1">☐ {}</a></p>"#,
            tab.slug(),
            html_escape(param),
            html_escape(label)
        ),
        Block::Download { label, href } => format!(
            r#"<p><a class="download" href="{}" download>{}</a></p>"#,
            html_escape(href),
            html_escape(label)
        ),
    }
}

fn render_form(form: &Form) -> String {
    match form {
        Form::Create => r#"<form method="post" action="/create">
<label>Describe the code or project to build</label>
<textarea name="description" rows="5" required></textarea>
<button type="submit">🚀 Create</button>
</form>"#
            .to_string(),
        Form::Search { query } => format!(
            r#"<form method="get" action="/">
<input type="hidden" name="tab" value="knowledge">
<input type="text" name="q" placeholder="Search knowledge" value="{}">
<button type="submit">🔍 Search</button>
</form>"#,
            html_escape(query)
        ),
        Form::AddKnowledge => r#"<details><summary>➕ Add knowledge</summary>
<form method="post" action="/knowledge">
<input type="text" name="topic" placeholder="Topic" required>
<textarea name="content" rows="4" placeholder="Content" required></textarea>
<button type="submit">Save</button>
</form></details>"#
            .to_string(),
    }
}

fn api_key_form() -> &'static str {
    r#"<form method="post" action="/session/key">
<label>AI API key</label>
<input type="password" name="api_key" autocomplete="off">
<button type="submit">Save key</button>
</form>"#
}

/// Full page: sidebar, tab navigation, forms, active tab panel.
pub fn page(active: Tab, sidebar: &Panel, view: &TabView) -> String {
    let nav: String = Tab::ALL
        .iter()
        .map(|t| {
            let class = if *t == active { r#" class="active""# } else { "" };
            format!(r#"<a href="/?tab={}"{}>{}</a>"#, t.slug(), class, t.label())
        })
        .collect();
    let forms: String = view.forms.iter().map(render_form).collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>AI Factory</title><style>{}</style></head>
<body>
<aside>{}{}</aside>
<main><nav>{}</nav>{}{}</main>
</body>
</html>"#,
        STYLE,
        render_panel(sidebar, active),
        api_key_form(),
        nav,
        forms,
        render_panel(&view.panel, active)
    )
}
