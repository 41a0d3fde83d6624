//! Sled-backed hub entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ENTRIES_TREE: &str = "hub_entries";

#[derive(Error, Debug)]
pub enum HubError {
    #[error("hub store error: {0}")]
    Storage(#[from] sled::Error),
    #[error("corrupt hub entry: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("hub entry needs a title")]
    EmptyTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

pub struct HubStore {
    path: PathBuf,
    db: sled::Db,
    entries: sled::Tree,
}

impl HubStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HubError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        let entries = db.open_tree(ENTRIES_TREE)?;
        Ok(Self { path, db, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store an entry. Blank categories are filed under `General`.
    pub fn add(&self, title: &str, content: &str, category: &str) -> Result<HubEntry, HubError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HubError::EmptyTitle);
        }
        let category = match category.trim() {
            "" => "General",
            c => c,
        };
        let entry = HubEntry {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            created_at: Utc::now(),
        };
        // Monotonic key prefix keeps iteration in insertion order.
        let key = format!("{:020}-{}", self.db.generate_id()?, entry.id);
        self.entries.insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        Ok(entry)
    }

    /// Newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<HubEntry>, HubError> {
        let mut out = Vec::new();
        for item in self.entries.iter().rev().take(limit) {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    pub fn category_counts(&self) -> Result<BTreeMap<String, usize>, HubError> {
        let mut counts = BTreeMap::new();
        for item in self.entries.iter() {
            let (_, value) = item?;
            let entry: HubEntry = serde_json::from_slice(&value)?;
            *counts.entry(entry.category).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_on_disk(&self) -> Result<u64, HubError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, HubStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HubStore::open(dir.path().join("hub")).unwrap();
        (dir, store)
    }

    #[test]
    fn add_and_list_newest_first() {
        let (_dir, store) = store();
        store.add("Plan: Demo", "Request from user: demo", "Research").unwrap();
        store.add("File: main.rs", "```rs\nfn main() {}\n```", "Source Code").unwrap();

        let entries = store.list(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "File: main.rs");
        assert_eq!(entries[1].category, "Research");
        assert_eq!(store.list(1).unwrap().len(), 1);
    }

    #[test]
    fn counts_by_category() {
        let (_dir, store) = store();
        store.add("a", "", "Research").unwrap();
        store.add("b", "", "Research").unwrap();
        store.add("c", "", "  ").unwrap();

        let counts = store.category_counts().unwrap();
        assert_eq!(counts.get("Research"), Some(&2));
        assert_eq!(counts.get("General"), Some(&1));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn blank_title_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(store.add("   ", "c", "k"), Err(HubError::EmptyTitle)));
        assert!(store.is_empty());
    }
}
