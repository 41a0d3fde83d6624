//! Module Resolver: locate the optional tab extension and bind its capabilities.
//!
//! Strategies, in order:
//! 1. each candidate logical name (package-qualified first, then bare), looked up in the
//!    in-process [`ModuleCatalog`] and then on the module search path;
//! 2. a direct load of `<caller_dir>/<lib file stem>`, tried once, last, bypassing the search path.
//!
//! The first strategy that yields a module exporting all three capabilities wins. Failures
//! never escape: they are collected in the [`ResolutionReport`].

use std::collections::HashMap;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::HubExtension;
use crate::error::LoadError;
use crate::registry::{BindingState, CapabilityRegistry, HubBindings};

pub const DEFAULT_CANDIDATES: [&str; 2] = ["web.ai_factory_tabs", "ai_factory_tabs"];
pub const DEFAULT_FILE_STEM: &str = "ai_factory_tabs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Qualified,
    Bare,
    FilePath,
}

/// One way of finding the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Strategy {
    Qualified(String),
    Bare(String),
    FilePath(PathBuf),
}

impl Strategy {
    /// Logical names containing a dot are package-qualified.
    pub fn for_name(name: &str) -> Self {
        if name.contains('.') {
            Strategy::Qualified(name.to_string())
        } else {
            Strategy::Bare(name.to_string())
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Qualified(_) => StrategyKind::Qualified,
            Strategy::Bare(_) => StrategyKind::Bare,
            Strategy::FilePath(_) => StrategyKind::FilePath,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Qualified(name) => write!(f, "qualified name `{}`", name),
            Strategy::Bare(name) => write!(f, "bare name `{}`", name),
            Strategy::FilePath(path) => write!(f, "file path {}", path.display()),
        }
    }
}

pub type ModuleConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn HubExtension>, LoadError> + Send + Sync>;

/// Extension modules compiled into the binary, keyed by logical name.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleConstructor>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn() -> Result<Arc<dyn HubExtension>, LoadError> + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(ctor));
    }

    fn construct(&self, name: &str) -> Option<Result<Arc<dyn HubExtension>, LoadError>> {
        self.modules.get(name).map(|ctor| ctor())
    }
}

/// Loads an extension from a file on disk.
pub trait ModuleLoader: Send + Sync {
    fn load_path(&self, path: &Path) -> Result<Arc<dyn HubExtension>, LoadError>;
}

/// Loader for builds without dynamic-library support.
pub struct NoDynamicLoading;

impl ModuleLoader for NoDynamicLoading {
    fn load_path(&self, path: &Path) -> Result<Arc<dyn HubExtension>, LoadError> {
        Err(LoadError::Library {
            path: path.to_path_buf(),
            message: "dynamic loading is not available in this build".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Logical names in priority order.
    pub candidates: Vec<String>,
    /// File stem of the extension library for the direct strategy.
    pub file_stem: String,
    /// Directories searched for logical names.
    pub search_path: Vec<PathBuf>,
    /// Directory of the caller (the executable). `None` disables the direct strategy.
    pub caller_dir: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            file_stem: DEFAULT_FILE_STEM.to_string(),
            search_path: Vec::new(),
            caller_dir: None,
        }
    }
}

impl ResolverConfig {
    /// `<caller_dir>/<platform library filename>`.
    pub fn direct_path(&self) -> Option<PathBuf> {
        self.caller_dir
            .as_ref()
            .map(|dir| dir.join(library_filename(&self.file_stem)))
    }
}

/// Platform library filename for a stem: `libfoo.so`, `libfoo.dylib`, `foo.dll`.
pub fn library_filename(stem: &str) -> String {
    format!("{}{}{}", DLL_PREFIX, stem, DLL_SUFFIX)
}

/// Search-path relative location of a logical name: `web.ai_factory_tabs` -> `web/libai_factory_tabs.so`.
pub fn module_relative_path(name: &str) -> PathBuf {
    let mut parts: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
    let last = parts.pop().unwrap_or(name);
    let mut path: PathBuf = parts.iter().collect();
    path.push(library_filename(last));
    path
}

#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub strategy: Strategy,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    pub strategy: Strategy,
    pub module: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub resolved: Option<Resolved>,
    /// Failed strategies, in the order they were tried.
    pub attempts: Vec<Attempt>,
    pub warnings: Vec<String>,
}

impl ResolutionReport {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

pub struct ModuleResolver<'a> {
    config: &'a ResolverConfig,
    catalog: &'a ModuleCatalog,
    loader: &'a dyn ModuleLoader,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(
        config: &'a ResolverConfig,
        catalog: &'a ModuleCatalog,
        loader: &'a dyn ModuleLoader,
    ) -> Self {
        Self {
            config,
            catalog,
            loader,
        }
    }

    /// Run every strategy until one binds. The report is also stored on the registry.
    pub fn resolve(&self, registry: &mut CapabilityRegistry) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        let settled = match registry.state() {
            BindingState::Unresolved => None,
            BindingState::Fallback => Some("capabilities already settled on fallback stubs".to_string()),
            BindingState::Real { module, .. } => {
                Some(format!("capabilities already bound to `{}`", module))
            }
        };
        if let Some(warning) = settled {
            tracing::warn!("Module resolver: {}; skipping", warning);
            report.warnings.push(warning);
            return report;
        }

        for name in &self.config.candidates {
            let strategy = Strategy::for_name(name);
            match self.load_by_name(name).and_then(|m| bind(registry, m, &strategy)) {
                Ok(module) => return self.finish(registry, report, strategy, module),
                Err(e) => {
                    tracing::debug!("Module resolver: {} failed: {}", strategy, e);
                    report.attempts.push(Attempt {
                        strategy,
                        error: e.to_string(),
                    });
                }
            }
        }

        match self.config.direct_path() {
            Some(path) => {
                let strategy = Strategy::FilePath(path.clone());
                if !path.is_file() {
                    report.attempts.push(Attempt {
                        strategy,
                        error: LoadError::NotFound(path.display().to_string()).to_string(),
                    });
                } else {
                    match self
                        .loader
                        .load_path(&path)
                        .and_then(|m| bind(registry, m, &strategy))
                    {
                        Ok(module) => return self.finish(registry, report, strategy, module),
                        Err(e) => {
                            tracing::warn!("Module resolver: direct load of {} failed: {}", path.display(), e);
                            report
                                .warnings
                                .push(format!("Direct file load failed: {}", e));
                            report.attempts.push(Attempt {
                                strategy,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
            None => report
                .warnings
                .push("Direct file load skipped: caller directory unknown".to_string()),
        }

        tracing::warn!(
            "🚨 Module resolver: could not load `{}` ({} strategies tried); running in degraded mode",
            self.config.file_stem,
            report.attempts.len()
        );
        registry.finish(report.clone());
        report
    }

    fn finish(
        &self,
        registry: &mut CapabilityRegistry,
        mut report: ResolutionReport,
        strategy: Strategy,
        module: String,
    ) -> ResolutionReport {
        tracing::info!("Module resolver: bound `{}` via {}", module, strategy);
        report.resolved = Some(Resolved { strategy, module });
        registry.finish(report.clone());
        report
    }

    /// Catalog first, then the first matching file on the search path.
    fn load_by_name(&self, name: &str) -> Result<Arc<dyn HubExtension>, LoadError> {
        if let Some(result) = self.catalog.construct(name) {
            return result;
        }
        let relative = module_relative_path(name);
        for dir in &self.config.search_path {
            let candidate = dir.join(&relative);
            if candidate.is_file() {
                return self.loader.load_path(&candidate);
            }
        }
        Err(LoadError::NotFound(name.to_string()))
    }
}

/// Bind all capabilities of `module` or none of them.
fn bind(
    registry: &mut CapabilityRegistry,
    module: Arc<dyn HubExtension>,
    strategy: &Strategy,
) -> Result<String, LoadError> {
    let bindings = HubBindings::from_extension(module.as_ref())?;
    let name = module.name().to_string();
    registry
        .bind_real(bindings, &name, strategy.kind())
        .map_err(|e| LoadError::Init {
            module: name.clone(),
            message: e.to_string(),
        })?;
    Ok(name)
}
