//! **Plugin Loader**: module catalog and the one-time resolution of the tab extension.
//!
//! Modules compiled into the binary are registered in the catalog behind Cargo
//! features; everything else is found on disk by the resolver:
//!
//! ```bash
//! cargo build -p factory-dashboard --features bundled-hub
//! ```

use std::path::PathBuf;
#[cfg(feature = "bundled-hub")]
use std::sync::Arc;

use factory_core::{
    default_search_path, CapabilityRegistry, EnvInfo, FactoryConfig, HubBindings, ModuleCatalog,
    ModuleResolver, ResolverConfig,
};
use factory_plugin::DylibLoader;

/// Extra module directories, `PATH`-style.
pub const MODULE_PATH_ENV: &str = "FACTORY_MODULE_PATH";

/// Register every feature-enabled module under its logical name.
pub fn module_catalog() -> ModuleCatalog {
    #[allow(unused_mut)]
    let mut catalog = ModuleCatalog::new();

    #[cfg(feature = "bundled-hub")]
    {
        tracing::info!("Registering bundled Universal Data Hub (web.ai_factory_tabs)...");
        catalog.register("web.ai_factory_tabs", || {
            ai_factory_tabs::HubModule::from_env()
                .map(|m| Arc::new(m) as Arc<dyn factory_core::HubExtension>)
                .map_err(|e| factory_core::LoadError::Init {
                    module: ai_factory_tabs::MODULE_NAME.to_string(),
                    message: e.to_string(),
                })
        });
    }

    catalog
}

/// Configured directories first, then the executable's root and own directory, then `FACTORY_MODULE_PATH`.
pub fn module_search_path(config: &FactoryConfig) -> Vec<PathBuf> {
    let extra = std::env::var(MODULE_PATH_ENV).ok();
    let mut path = config.module_search_path.clone();
    for dir in default_search_path(extra.as_deref()) {
        if !path.contains(&dir) {
            path.push(dir);
        }
    }
    path
}

pub fn resolver_config(config: &FactoryConfig) -> ResolverConfig {
    let caller_dir = config.plugin_dir.clone().or_else(|| {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    });
    ResolverConfig {
        candidates: config.module_candidates.clone(),
        file_stem: config.module_file_stem.clone(),
        search_path: module_search_path(config),
        caller_dir,
    }
}

/// Run the resolver once and return the registry the server shares.
pub fn initialize_registry(config: &FactoryConfig) -> CapabilityRegistry {
    let resolver_config = resolver_config(config);
    let env = EnvInfo::capture(&resolver_config.search_path);
    let mut registry =
        CapabilityRegistry::new(HubBindings::fallback(&resolver_config.file_stem, env));
    let catalog = module_catalog();
    let loader = DylibLoader::new();
    let report = ModuleResolver::new(&resolver_config, &catalog, &loader).resolve(&mut registry);
    for warning in &report.warnings {
        tracing::warn!("Module resolver: {}", warning);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_search_path_comes_first() {
        let config = FactoryConfig {
            module_search_path: vec![PathBuf::from("/opt/factory/modules")],
            plugin_dir: Some(PathBuf::from("/opt/factory/plugins")),
            ..FactoryConfig::default()
        };
        let resolver = resolver_config(&config);
        assert_eq!(resolver.search_path[0], PathBuf::from("/opt/factory/modules"));
        assert_eq!(resolver.caller_dir, Some(PathBuf::from("/opt/factory/plugins")));
        assert_eq!(resolver.candidates, vec!["web.ai_factory_tabs", "ai_factory_tabs"]);
    }

    #[cfg(not(feature = "bundled-hub"))]
    #[test]
    fn no_module_anywhere_leaves_registry_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let config = FactoryConfig {
            plugin_dir: Some(dir.path().to_path_buf()),
            module_candidates: vec!["factory_test.absent_module".to_string()],
            module_file_stem: "factory_test_absent_module".to_string(),
            ..FactoryConfig::default()
        };
        let registry = initialize_registry(&config);
        assert!(registry.is_degraded());
        let report = registry.report().unwrap();
        assert_eq!(report.attempts.len(), 2);
    }
}
