//! DylibLoader: load the tab extension from a .so/.dylib/.dll via libloading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use factory_core::{abi, HubExtension, LoadError, ModuleLoader};
use libloading::Library;

use crate::module::{AddFn, DynamicHubModule, FreeFn, HubSymbols, RenderFn};

/// Opens extension libraries and keeps each one mapped for the life of the process.
/// Loading the same path twice returns the already-mapped module.
#[derive(Default)]
pub struct DylibLoader {
    loaded: RwLock<HashMap<PathBuf, Arc<DynamicHubModule>>>,
}

impl DylibLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.loaded
            .read()
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn open(path: &Path) -> Result<DynamicHubModule, LoadError> {
        let lib = unsafe {
            Library::new(path).map_err(|e| LoadError::Library {
                path: path.to_path_buf(),
                message: format!("libloading: {}", e),
            })?
        };
        // Absent symbols are left as None; the resolver rejects incomplete modules.
        let symbols = unsafe {
            HubSymbols {
                render_data_hub: lib.get::<RenderFn>(abi::RENDER_DATA_HUB).ok().map(|s| *s),
                render_system_management: lib.get::<RenderFn>(abi::RENDER_SYSTEM_MANAGEMENT).ok().map(|s| *s),
                add: lib.get::<AddFn>(abi::ADD_TO_HUB).ok().map(|s| *s),
                free: lib.get::<FreeFn>(abi::FREE).ok().map(|s| *s),
            }
        };
        tracing::info!(
            "Loaded extension library {} (data hub: {}, system: {}, add: {}, free: {})",
            path.display(),
            symbols.render_data_hub.is_some(),
            symbols.render_system_management.is_some(),
            symbols.add.is_some(),
            symbols.free.is_some()
        );
        Ok(DynamicHubModule::new(
            path.display().to_string(),
            symbols,
            Some(lib),
        ))
    }
}

impl ModuleLoader for DylibLoader {
    fn load_path(&self, path: &Path) -> Result<Arc<dyn HubExtension>, LoadError> {
        if let Some(module) = self.loaded.read().ok().and_then(|g| g.get(path).cloned()) {
            return Ok(module);
        }
        let module = Arc::new(Self::open(path)?);
        if let Ok(mut guard) = self.loaded.write() {
            guard.insert(path.to_path_buf(), Arc::clone(&module));
        }
        Ok(module)
    }
}
