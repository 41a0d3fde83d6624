//! factory-core: the AI Factory dashboard's module resolver, capability registry
//! and degraded-mode collaborators.
//!
//! ## Tab extension
//!
//! The Universal Data Hub extension is optional. At startup the [`ModuleResolver`]
//! tries, in order, every configured logical name (in-process [`ModuleCatalog`]
//! first, then the module search path) and finally a direct file-path load of
//! `<exe dir>/<lib>ai_factory_tabs<.so|.dylib|.dll>`. The first module exporting
//! all three capabilities is bound into the [`CapabilityRegistry`]; otherwise the
//! registry keeps its fallback stubs and the dashboard runs degraded.
//!
//! ## Collaborators
//!
//! Orchestrator, memory store and workflow client are each one trait with a
//! real and a stand-in implementation, handed out as [`Bound`] handles that
//! remember their [`Origin`]. A [`Session`] caches them per browser session.

mod capability;
mod config;
mod environment;
mod error;
mod facade;
mod fallback;
pub mod memory;
pub mod orchestrator;
mod registry;
mod resolver;
mod session;
pub mod ui;
pub mod workflow;

pub use capability::{
    abi, HubCapability, HubEntryRequest, HubExtension, HubWriter, RenderContext, TabRenderer,
};
pub use config::{
    FactoryConfig, Secrets, SecretsError, WorkflowSettings, AI_API_KEY_KEY, DEFAULT_N8N_BASE_URL,
    N8N_API_KEY_KEY, N8N_BASE_URL_KEY,
};
pub use environment::{default_search_path, EnvInfo};
pub use error::{LoadError, RegistryError};
pub use facade::{Bound, Origin};
pub use fallback::{FallbackDataHubTab, FallbackHubWriter, FallbackSystemManagementTab, DIAGNOSTICS_PARAM};
pub use memory::{ExecutionStatus, KnowledgeEntry, MemoryError, MemoryStatistics, MemoryStore, SledMemory, UnavailableMemory};
pub use orchestrator::{
    LlmOrchestrator, Orchestrator, OrchestratorError, OrchestratorSettings, ProcessResult,
    UnavailableOrchestrator,
};
pub use registry::{BindingState, CapabilityRegistry, HubBindings};
pub use resolver::{
    library_filename, module_relative_path, Attempt, ModuleCatalog, ModuleConstructor,
    ModuleLoader, ModuleResolver, NoDynamicLoading, ResolutionReport, Resolved, ResolverConfig,
    Strategy, StrategyKind, DEFAULT_CANDIDATES, DEFAULT_FILE_STEM,
};
pub use session::{Collaborators, LiveCollaborators, Session, PLAN_CATEGORY, SOURCE_CATEGORY};
pub use ui::{Block, Panel};
pub use workflow::{OfflineWorkflowClient, WorkflowClient, WorkflowError};
