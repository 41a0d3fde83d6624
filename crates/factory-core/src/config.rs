//! Dashboard configuration and the secrets store.
//!
//! `FactoryConfig` precedence: `FACTORY__*` env > `FACTORY_CONFIG` file (default
//! `config/factory.toml`) > built-in defaults.
//!
//! Secrets come from a flat TOML table (`FACTORY_SECRETS`, default `.factory/secrets.toml`);
//! a process environment variable of the same name wins over the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::{DEFAULT_CANDIDATES, DEFAULT_FILE_STEM};

pub const N8N_BASE_URL_KEY: &str = "N8N_BASE_URL";
pub const N8N_API_KEY_KEY: &str = "N8N_API_KEY";
pub const DEFAULT_N8N_BASE_URL: &str = "http://localhost:5678";
/// Optional secret pre-filling every session's AI API key.
pub const AI_API_KEY_KEY: &str = "AI_API_KEY";

const DEFAULT_SECRETS_PATH: &str = ".factory/secrets.toml";

fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect()
}

fn default_file_stem() -> String {
    DEFAULT_FILE_STEM.to_string()
}

fn default_session_idle_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    1024
}

/// Dashboard settings.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | bind_addr | 127.0.0.1:8501 | HTTP listen address |
/// | data_dir | ./data | Root for the memory store and generated projects |
/// | module_candidates | web.ai_factory_tabs, ai_factory_tabs | Logical names tried in order |
/// | module_file_stem | ai_factory_tabs | Library stem for the direct file-path load |
/// | module_search_path | (empty) | Extra directories searched for logical names |
/// | plugin_dir | executable dir | Directory of the direct file-path load |
/// | llm_api_base | https://openrouter.ai/api/v1 | OpenAI-compatible endpoint of the orchestrator |
/// | llm_model | meta-llama/llama-3.3-70b-instruct | Model the orchestrator asks for |
/// | session_idle_secs | 3600 | Sessions unseen for this long are evicted |
/// | max_sessions | 1024 | Upper bound on live sessions; the least recently seen is evicted first |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    #[serde(default = "default_candidates")]
    pub module_candidates: Vec<String>,
    #[serde(default = "default_file_stem")]
    pub module_file_stem: String,
    #[serde(default)]
    pub module_search_path: Vec<PathBuf>,
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
    pub llm_api_base: String,
    pub llm_model: String,
    #[serde(default)]
    pub secrets_path: Option<PathBuf>,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8501".to_string(),
            data_dir: PathBuf::from("./data"),
            module_candidates: default_candidates(),
            module_file_stem: default_file_stem(),
            module_search_path: Vec::new(),
            plugin_dir: None,
            llm_api_base: "https://openrouter.ai/api/v1".to_string(),
            llm_model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            secrets_path: None,
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl FactoryConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("FACTORY_CONFIG").unwrap_or_else(|_| "config/factory.toml".to_string());
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("data_dir", "./data")?
            .set_default("llm_api_base", defaults.llm_api_base)?
            .set_default("llm_model", defaults.llm_model)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        builder
            .add_source(
                config::Environment::with_prefix("FACTORY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("module_candidates")
                    .with_list_parse_key("module_search_path")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join("memory")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.secrets_path
            .clone()
            .or_else(|| std::env::var("FACTORY_SECRETS").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("failed to read secrets file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid secrets file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Key-value secrets. Lookups consult the process environment first.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    /// Read a secrets file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, SecretsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| SecretsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: toml::Table = toml::from_str(&content).map_err(|source| SecretsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let values = table
            .into_iter()
            .filter_map(|(k, v)| match v {
                toml::Value::String(s) => Some((k, s)),
                toml::Value::Integer(_) | toml::Value::Float(_) | toml::Value::Boolean(_) => {
                    Some((k, v.to_string()))
                }
                _ => None,
            })
            .collect();
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| self.values.get(key).cloned())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

/// Connection settings for the workflow-automation client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_N8N_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl WorkflowSettings {
    pub fn from_secrets(secrets: &Secrets) -> Self {
        Self {
            base_url: secrets.get_or(N8N_BASE_URL_KEY, DEFAULT_N8N_BASE_URL),
            api_key: secrets.get(N8N_API_KEY_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secrets_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = Secrets::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(secrets.get("FACTORY_TEST_ABSENT_KEY"), None);
    }

    #[test]
    fn secrets_file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(
            &path,
            "FACTORY_TEST_URL = \"http://n8n.internal:5678\"\nFACTORY_TEST_PORT = 5678\n",
        )
        .unwrap();
        let secrets = Secrets::load(&path).unwrap();
        assert_eq!(
            secrets.get("FACTORY_TEST_URL").as_deref(),
            Some("http://n8n.internal:5678")
        );
        assert_eq!(secrets.get("FACTORY_TEST_PORT").as_deref(), Some("5678"));
    }

    #[test]
    fn invalid_secrets_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(Secrets::load(&path), Err(SecretsError::Parse { .. })));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let secrets = Secrets::from_pairs([("FACTORY_TEST_BLANK", "  ")]);
        assert_eq!(secrets.get_or("FACTORY_TEST_BLANK", "fallback"), "fallback");
    }

    #[test]
    fn config_defaults_match_dashboard_expectations() {
        let config = FactoryConfig::default();
        assert_eq!(config.module_candidates, vec!["web.ai_factory_tabs", "ai_factory_tabs"]);
        assert_eq!(config.memory_path(), PathBuf::from("./data/memory"));
        assert_eq!(config.output_dir(), PathBuf::from("./data/projects"));
    }
}
