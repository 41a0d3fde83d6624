//! Startup environment snapshot: where the executable lives and where modules are searched.
//! Shown behind the diagnostics opt-in when the tab extension is missing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Number of search-path entries kept for diagnostics.
const SEARCH_PATH_PREVIEW: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnvInfo {
    /// Snapshot based on the running executable.
    pub fn capture(search_path: &[PathBuf]) -> Self {
        match std::env::current_exe() {
            Ok(exe) => Self::from_file(&exe, search_path),
            Err(e) => Self {
                search_path: preview(search_path),
                error: Some(e.to_string()),
                ..Self::default()
            },
        }
    }

    /// Snapshot for an explicit file (the executable, or a test fixture).
    pub fn from_file(file: &Path, search_path: &[PathBuf]) -> Self {
        let this_dir = file.parent().map(Path::to_path_buf);
        let root_dir = this_dir
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        Self {
            this_file: Some(file.to_path_buf()),
            this_dir,
            root_dir,
            search_path: preview(search_path),
            error: None,
        }
    }
}

fn preview(search_path: &[PathBuf]) -> Vec<PathBuf> {
    search_path.iter().take(SEARCH_PATH_PREVIEW).cloned().collect()
}

/// Default module search path: root dir, then the executable's dir, then `FACTORY_MODULE_PATH` entries.
pub fn default_search_path(extra: Option<&str>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(root) = dir.parent() {
                out.push(root.to_path_buf());
            }
            out.push(dir.to_path_buf());
        }
    }
    if let Some(extra) = extra {
        for p in std::env::split_paths(extra) {
            if !p.as_os_str().is_empty() && !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_dir_is_parent_of_this_dir() {
        let info = EnvInfo::from_file(Path::new("/opt/factory/bin/factory-dashboard"), &[]);
        assert_eq!(info.this_dir.as_deref(), Some(Path::new("/opt/factory/bin")));
        assert_eq!(info.root_dir.as_deref(), Some(Path::new("/opt/factory")));
        assert!(info.error.is_none());
    }

    #[test]
    fn search_path_preview_is_capped() {
        let paths: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("/p{}", i))).collect();
        let info = EnvInfo::from_file(Path::new("/x/y"), &paths);
        assert_eq!(info.search_path.len(), 5);
        assert_eq!(info.search_path[0], PathBuf::from("/p0"));
    }
}
