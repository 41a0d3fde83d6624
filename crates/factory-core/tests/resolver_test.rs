//! Module resolver: strategy order, all-or-nothing binding and degraded fallback.
//!
//! Run with: `cargo test -p factory-core --test resolver_test`

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use factory_core::{
    library_filename, BindingState, CapabilityRegistry, EnvInfo, HubBindings, HubExtension,
    HubWriter, LoadError, ModuleCatalog, ModuleLoader, ModuleResolver, Panel, RenderContext,
    ResolverConfig, Strategy, StrategyKind, TabRenderer,
};

struct Rendering(&'static str);

impl TabRenderer for Rendering {
    fn render(&self, _ctx: &RenderContext) -> Panel {
        Panel::new().heading(self.0)
    }
}

struct Accepting;

impl HubWriter for Accepting {
    fn add_to_hub(&self, _title: &str, _content: &str, _category: &str) -> bool {
        true
    }
}

struct FakeModule {
    name: String,
    with_writer: bool,
}

impl HubExtension for FakeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_hub_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        Some(Arc::new(Rendering("Universal Data Hub")))
    }

    fn system_management_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        Some(Arc::new(Rendering("System Management")))
    }

    fn hub_writer(&self) -> Option<Arc<dyn HubWriter>> {
        if self.with_writer {
            Some(Arc::new(Accepting))
        } else {
            None
        }
    }
}

fn module(name: &str, with_writer: bool) -> Result<Arc<dyn HubExtension>, LoadError> {
    Ok(Arc::new(FakeModule {
        name: name.to_string(),
        with_writer,
    }))
}

/// Loader that records every path it is asked for.
#[derive(Default)]
struct RecordingLoader {
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl ModuleLoader for RecordingLoader {
    fn load_path(&self, path: &Path) -> Result<Arc<dyn HubExtension>, LoadError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(LoadError::Library {
                path: path.to_path_buf(),
                message: "undefined symbol".to_string(),
            });
        }
        module(&path.display().to_string(), true)
    }
}

fn registry() -> CapabilityRegistry {
    CapabilityRegistry::new(HubBindings::fallback("ai_factory_tabs", EnvInfo::default()))
}

fn config(caller_dir: Option<&Path>, search_path: Vec<PathBuf>) -> ResolverConfig {
    ResolverConfig {
        search_path,
        caller_dir: caller_dir.map(Path::to_path_buf),
        ..ResolverConfig::default()
    }
}

fn heading(panel: &Panel) -> String {
    serde_json::to_value(panel).unwrap()["blocks"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn qualified_name_wins_when_every_candidate_is_available() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(library_filename("ai_factory_tabs")), b"").unwrap();
    let mut catalog = ModuleCatalog::new();
    catalog.register("web.ai_factory_tabs", || module("web.ai_factory_tabs", true));
    catalog.register("ai_factory_tabs", || module("ai_factory_tabs", true));
    let loader = RecordingLoader::default();
    let config = config(Some(dir.path()), Vec::new());
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert!(report.is_resolved());
    assert!(report.attempts.is_empty());
    assert_eq!(
        report.resolved.as_ref().map(|r| &r.strategy),
        Some(&Strategy::Qualified("web.ai_factory_tabs".to_string()))
    );
    assert!(loader.calls.lock().unwrap().is_empty());
    assert_eq!(
        registry.state(),
        &BindingState::Real {
            module: "web.ai_factory_tabs".to_string(),
            strategy: StrategyKind::Qualified,
        }
    );
}

#[test]
fn bare_name_is_tried_after_qualified_fails() {
    let mut catalog = ModuleCatalog::new();
    catalog.register("ai_factory_tabs", || module("ai_factory_tabs", true));
    let loader = RecordingLoader::default();
    let config = config(None, Vec::new());
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    let resolved = report.resolved.as_ref().unwrap();
    assert_eq!(resolved.strategy.kind(), StrategyKind::Bare);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].strategy.kind(), StrategyKind::Qualified);
    assert!(!registry.is_degraded());
}

#[test]
fn exhausted_strategies_leave_stubs_bound() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ModuleCatalog::new();
    let loader = RecordingLoader::default();
    let config = config(Some(dir.path()), vec![dir.path().to_path_buf()]);
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert!(!report.is_resolved());
    let kinds: Vec<StrategyKind> = report.attempts.iter().map(|a| a.strategy.kind()).collect();
    assert_eq!(
        kinds,
        vec![StrategyKind::Qualified, StrategyKind::Bare, StrategyKind::FilePath]
    );
    // Missing file: the loader is never invoked.
    assert!(loader.calls.lock().unwrap().is_empty());
    assert_eq!(registry.state(), &BindingState::Fallback);
    assert!(registry.data_hub_tab().render(&RenderContext::default()).has_error());
    assert!(registry
        .system_management_tab()
        .render(&RenderContext::default())
        .has_error());
    assert!(!registry.hub_writer().add_to_hub("title", "content", "Research"));
    assert!(registry.report().is_some());
}

#[test]
fn direct_path_binds_all_three_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let direct = dir.path().join(library_filename("ai_factory_tabs"));
    std::fs::write(&direct, b"").unwrap();
    let catalog = ModuleCatalog::new();
    let loader = RecordingLoader::default();
    let config = config(Some(dir.path()), Vec::new());
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert_eq!(
        report.resolved.as_ref().map(|r| r.strategy.clone()),
        Some(Strategy::FilePath(direct.clone()))
    );
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(loader.calls.lock().unwrap().as_slice(), &[direct]);

    let ctx = RenderContext::default();
    assert_eq!(heading(&registry.data_hub_tab().render(&ctx)), "Universal Data Hub");
    assert_eq!(
        heading(&registry.system_management_tab().render(&ctx)),
        "System Management"
    );
    assert!(registry.hub_writer().add_to_hub("t", "c", "k"));
}

#[test]
fn logical_names_are_looked_up_on_the_search_path() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("web");
    std::fs::create_dir_all(&nested).unwrap();
    let expected = nested.join(library_filename("ai_factory_tabs"));
    std::fs::write(&expected, b"").unwrap();
    let catalog = ModuleCatalog::new();
    let loader = RecordingLoader::default();
    let config = config(None, vec![dir.path().join("absent"), dir.path().to_path_buf()]);
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert_eq!(
        report.resolved.as_ref().map(|r| r.strategy.kind()),
        Some(StrategyKind::Qualified)
    );
    assert_eq!(loader.calls.lock().unwrap().as_slice(), &[expected]);
}

#[test]
fn partial_module_falls_through_to_next_strategy() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(library_filename("ai_factory_tabs")), b"").unwrap();
    let mut catalog = ModuleCatalog::new();
    catalog.register("web.ai_factory_tabs", || module("web.ai_factory_tabs", false));
    catalog.register("ai_factory_tabs", || module("ai_factory_tabs", false));
    let loader = RecordingLoader::default();
    let config = config(Some(dir.path()), Vec::new());
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert_eq!(
        report.resolved.as_ref().map(|r| r.strategy.kind()),
        Some(StrategyKind::FilePath)
    );
    assert_eq!(report.attempts.len(), 2);
    assert!(report.attempts[0].error.contains("add_to_hub"));
    assert!(registry.hub_writer().add_to_hub("t", "c", "k"));
}

#[test]
fn direct_load_error_becomes_warning() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(library_filename("ai_factory_tabs")), b"").unwrap();
    let catalog = ModuleCatalog::new();
    let loader = RecordingLoader {
        fail: true,
        ..RecordingLoader::default()
    };
    let config = config(Some(dir.path()), Vec::new());
    let mut registry = registry();

    let report = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert!(!report.is_resolved());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("undefined symbol"));
    assert_eq!(loader.calls.lock().unwrap().len(), 1);
    assert!(registry.is_degraded());
}

#[test]
fn resolving_a_bound_registry_changes_nothing() {
    let mut catalog = ModuleCatalog::new();
    catalog.register("ai_factory_tabs", || module("ai_factory_tabs", true));
    let loader = RecordingLoader::default();
    let config = config(None, Vec::new());
    let mut registry = registry();

    ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);
    let second = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert!(!second.is_resolved());
    assert_eq!(second.warnings.len(), 1);
    assert!(matches!(
        registry.state(),
        BindingState::Real { strategy: StrategyKind::Bare, .. }
    ));
}

#[test]
fn registry_settled_on_fallback_is_not_rebound() {
    let empty = ModuleCatalog::new();
    let loader = RecordingLoader::default();
    let config = config(None, Vec::new());
    let mut registry = registry();
    let first = ModuleResolver::new(&config, &empty, &loader).resolve(&mut registry);
    assert!(!first.is_resolved());
    assert_eq!(registry.state(), &BindingState::Fallback);

    // The module shows up later; the settled registry still keeps its stubs.
    let mut catalog = ModuleCatalog::new();
    catalog.register("ai_factory_tabs", || module("ai_factory_tabs", true));
    let second = ModuleResolver::new(&config, &catalog, &loader).resolve(&mut registry);

    assert!(!second.is_resolved());
    assert!(second.attempts.is_empty());
    assert!(second.warnings[0].contains("fallback"));
    assert_eq!(registry.state(), &BindingState::Fallback);
    assert!(!registry.hub_writer().add_to_hub("t", "c", "k"));
    assert_eq!(registry.report().map(|r| r.attempts.len()), Some(first.attempts.len()));
}
