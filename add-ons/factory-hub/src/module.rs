use std::path::{Path, PathBuf};
use std::sync::Arc;

use factory_core::{HubExtension, HubWriter, TabRenderer};

use crate::store::{HubError, HubStore};
use crate::tabs::{DataHubTab, StoreWriter, SystemManagementTab};

/// Env var overriding where the hub store lives.
pub const HUB_PATH_ENV: &str = "FACTORY_HUB_PATH";
pub const DEFAULT_HUB_PATH: &str = "./data/hub";
pub const MODULE_NAME: &str = "ai_factory_tabs";

/// The Universal Data Hub extension: both tabs and the writer share one store.
pub struct HubModule {
    store: Arc<HubStore>,
}

impl HubModule {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HubError> {
        let store = HubStore::open(path)?;
        tracing::info!("Universal Data Hub store at {}", store.path().display());
        Ok(Self {
            store: Arc::new(store),
        })
    }

    /// Open the store at `FACTORY_HUB_PATH` (default `./data/hub`).
    pub fn from_env() -> Result<Self, HubError> {
        Self::open(hub_path())
    }

    pub fn store(&self) -> &Arc<HubStore> {
        &self.store
    }
}

pub fn hub_path() -> PathBuf {
    std::env::var(HUB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HUB_PATH))
}

impl HubExtension for HubModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn data_hub_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        Some(Arc::new(DataHubTab::new(Arc::clone(&self.store))))
    }

    fn system_management_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        Some(Arc::new(SystemManagementTab::new(Arc::clone(&self.store))))
    }

    fn hub_writer(&self) -> Option<Arc<dyn HubWriter>> {
        Some(Arc::new(StoreWriter::new(Arc::clone(&self.store))))
    }
}
