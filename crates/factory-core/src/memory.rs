//! Memory / knowledge store: code files, knowledge entries and execution history.
//! Sled-backed, one tree per record kind.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const CODE_FILES_TREE: &str = "code_files";
const KNOWLEDGE_TREE: &str = "knowledge";
const EXECUTIONS_TREE: &str = "executions";
const SEARCH_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory store error: {0}")]
    Storage(#[from] sled::Error),
    #[error("corrupt memory record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub total_code_files: usize,
    pub total_knowledge: usize,
    pub total_executions: usize,
    #[serde(default)]
    pub executions_by_status: BTreeMap<String, usize>,
}

impl MemoryStatistics {
    /// Whole-percent share of successful executions; 0 when nothing has run.
    pub fn success_rate_percent(&self) -> usize {
        let success = self
            .executions_by_status
            .get(ExecutionStatus::Success.as_str())
            .copied()
            .unwrap_or(0);
        success * 100 / self.total_executions.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExecutionRecord {
    description: String,
    status: ExecutionStatus,
    at: DateTime<Utc>,
}

pub trait MemoryStore: Send + Sync {
    fn get_statistics(&self) -> Result<MemoryStatistics, MemoryError>;
    fn search_knowledge(&self, query: &str) -> Result<Vec<KnowledgeEntry>, MemoryError>;
    /// Returns false when the entry could not be stored.
    fn add_knowledge(&self, topic: &str, content: &str) -> bool;
    fn record_code_file(&self, path: &Path) -> bool;
    fn record_execution(&self, description: &str, status: ExecutionStatus) -> bool;
}

/// Sled-backed store. Cloning shares the same database handle.
#[derive(Clone)]
pub struct SledMemory {
    db: sled::Db,
    code_files: sled::Tree,
    knowledge: sled::Tree,
    executions: sled::Tree,
}

impl SledMemory {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> Result<Self, MemoryError> {
        Ok(Self {
            db: db.clone(),
            code_files: db.open_tree(CODE_FILES_TREE)?,
            knowledge: db.open_tree(KNOWLEDGE_TREE)?,
            executions: db.open_tree(EXECUTIONS_TREE)?,
        })
    }

    /// Monotonic key so iteration order is insertion order.
    fn record_key(&self) -> Result<String, MemoryError> {
        Ok(format!("{:020}-{}", self.db.generate_id()?, Uuid::new_v4().simple()))
    }

    fn insert_knowledge(&self, topic: &str, content: &str) -> Result<(), MemoryError> {
        let entry = KnowledgeEntry {
            topic: topic.to_string(),
            content: content.to_string(),
            created_at: Some(Utc::now()),
        };
        self.knowledge
            .insert(self.record_key()?.as_bytes(), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    fn insert_execution(&self, description: &str, status: ExecutionStatus) -> Result<(), MemoryError> {
        let record = ExecutionRecord {
            description: description.to_string(),
            status,
            at: Utc::now(),
        };
        self.executions
            .insert(self.record_key()?.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(())
    }
}

impl MemoryStore for SledMemory {
    fn get_statistics(&self) -> Result<MemoryStatistics, MemoryError> {
        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_executions = 0;
        for item in self.executions.iter() {
            let (_, value) = item?;
            let record: ExecutionRecord = serde_json::from_slice(&value)?;
            *by_status.entry(record.status.as_str().to_string()).or_default() += 1;
            total_executions += 1;
        }
        Ok(MemoryStatistics {
            total_code_files: self.code_files.len(),
            total_knowledge: self.knowledge.len(),
            total_executions,
            executions_by_status: by_status,
        })
    }

    /// Case-insensitive substring match on topic or content, newest first.
    fn search_knowledge(&self, query: &str) -> Result<Vec<KnowledgeEntry>, MemoryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits = Vec::new();
        for item in self.knowledge.iter().rev() {
            let (_, value) = item?;
            let entry: KnowledgeEntry = serde_json::from_slice(&value)?;
            if entry.topic.to_lowercase().contains(&needle)
                || entry.content.to_lowercase().contains(&needle)
            {
                hits.push(entry);
                if hits.len() >= SEARCH_LIMIT {
                    break;
                }
            }
        }
        Ok(hits)
    }

    fn add_knowledge(&self, topic: &str, content: &str) -> bool {
        match self.insert_knowledge(topic, content) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Memory: add_knowledge failed: {}", e);
                false
            }
        }
    }

    fn record_code_file(&self, path: &Path) -> bool {
        let key = path.to_string_lossy();
        let stamp = Utc::now().to_rfc3339();
        match self.code_files.insert(key.as_bytes(), stamp.as_bytes()) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Memory: record_code_file {} failed: {}", key, e);
                false
            }
        }
    }

    fn record_execution(&self, description: &str, status: ExecutionStatus) -> bool {
        match self.insert_execution(description, status) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Memory: record_execution failed: {}", e);
                false
            }
        }
    }
}

/// Stand-in when the store cannot be opened: zero statistics, no hits, writes refused.
pub struct UnavailableMemory;

impl MemoryStore for UnavailableMemory {
    fn get_statistics(&self) -> Result<MemoryStatistics, MemoryError> {
        Ok(MemoryStatistics::default())
    }

    fn search_knowledge(&self, _query: &str) -> Result<Vec<KnowledgeEntry>, MemoryError> {
        Ok(Vec::new())
    }

    fn add_knowledge(&self, _topic: &str, _content: &str) -> bool {
        false
    }

    fn record_code_file(&self, _path: &Path) -> bool {
        false
    }

    fn record_execution(&self, _description: &str, _status: ExecutionStatus) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SledMemory) {
        let dir = tempfile::tempdir().unwrap();
        let memory = SledMemory::open(dir.path().join("memory")).unwrap();
        (dir, memory)
    }

    #[test]
    fn statistics_count_each_record_kind() {
        let (_dir, memory) = store();
        assert!(memory.record_code_file(Path::new("/tmp/p/main.rs")));
        assert!(memory.record_code_file(Path::new("/tmp/p/main.rs")));
        assert!(memory.record_code_file(Path::new("/tmp/p/lib.rs")));
        assert!(memory.add_knowledge("Rust", "Ownership rules"));
        assert!(memory.record_execution("build a CLI", ExecutionStatus::Success));
        assert!(memory.record_execution("build a GUI", ExecutionStatus::Failed));
        assert!(memory.record_execution("build an API", ExecutionStatus::Success));

        let stats = memory.get_statistics().unwrap();
        assert_eq!(stats.total_code_files, 2);
        assert_eq!(stats.total_knowledge, 1);
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.executions_by_status.get("success"), Some(&2));
        assert_eq!(stats.success_rate_percent(), 66);
    }

    #[test]
    fn success_rate_is_zero_without_executions() {
        assert_eq!(MemoryStatistics::default().success_rate_percent(), 0);
    }

    #[test]
    fn search_matches_topic_or_content_case_insensitively() {
        let (_dir, memory) = store();
        memory.add_knowledge("Sled trees", "Each tree is a keyspace");
        memory.add_knowledge("Axum", "Routers compose with nest");
        memory.add_knowledge("Tokio", "The runtime drives SLED flushes too");

        let hits = memory.search_knowledge("sled").unwrap();
        let topics: Vec<&str> = hits.iter().map(|h| h.topic.as_str()).collect();
        assert_eq!(topics, vec!["Tokio", "Sled trees"]);
        assert!(memory.search_knowledge("   ").unwrap().is_empty());
    }

    #[test]
    fn unavailable_memory_is_inert() {
        let memory = UnavailableMemory;
        assert_eq!(memory.get_statistics().unwrap(), MemoryStatistics::default());
        assert!(memory.search_knowledge("anything").unwrap().is_empty());
        assert!(!memory.add_knowledge("t", "c"));
        assert!(!memory.record_execution("d", ExecutionStatus::Success));
    }
}
