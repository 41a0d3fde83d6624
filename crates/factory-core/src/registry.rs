//! Process-wide capability registry (service locator for the tab extension).
//!
//! Built once at startup with fallback stubs, possibly rebound once by the
//! [`ModuleResolver`](crate::ModuleResolver), then shared read-only.

use std::sync::Arc;

use serde::Serialize;

use crate::capability::{HubCapability, HubExtension, HubWriter, TabRenderer};
use crate::environment::EnvInfo;
use crate::error::{LoadError, RegistryError};
use crate::fallback::{FallbackDataHubTab, FallbackHubWriter, FallbackSystemManagementTab};
use crate::resolver::{ResolutionReport, StrategyKind};

/// The three hub capabilities, always bound together.
#[derive(Clone)]
pub struct HubBindings {
    pub data_hub_tab: Arc<dyn TabRenderer>,
    pub system_management_tab: Arc<dyn TabRenderer>,
    pub hub_writer: Arc<dyn HubWriter>,
}

impl HubBindings {
    /// Stubs naming `module` as the missing extension.
    pub fn fallback(module: &str, env: EnvInfo) -> Self {
        Self {
            data_hub_tab: Arc::new(FallbackDataHubTab::new(module, env)),
            system_management_tab: Arc::new(FallbackSystemManagementTab),
            hub_writer: Arc::new(FallbackHubWriter),
        }
    }

    /// Extract every capability from a loaded module. Missing one is a failure of the whole set.
    pub fn from_extension(ext: &dyn HubExtension) -> Result<Self, LoadError> {
        let missing = |capability: HubCapability| LoadError::MissingCapability {
            module: ext.name().to_string(),
            capability,
        };
        Ok(Self {
            data_hub_tab: ext
                .data_hub_tab()
                .ok_or_else(|| missing(HubCapability::DataHubTab))?,
            system_management_tab: ext
                .system_management_tab()
                .ok_or_else(|| missing(HubCapability::SystemManagementTab))?,
            hub_writer: ext
                .hub_writer()
                .ok_or_else(|| missing(HubCapability::AddToHub))?,
        })
    }
}

/// Unresolved -> Fallback | Real. Both outcomes are terminal: a registry is resolved once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BindingState {
    Unresolved,
    Fallback,
    Real {
        module: String,
        strategy: StrategyKind,
    },
}

pub struct CapabilityRegistry {
    bindings: HubBindings,
    state: BindingState,
    report: Option<ResolutionReport>,
}

impl CapabilityRegistry {
    pub fn new(fallback: HubBindings) -> Self {
        Self {
            bindings: fallback,
            state: BindingState::Unresolved,
            report: None,
        }
    }

    /// Replace all stubs with a real set. Allowed only while unresolved.
    pub fn bind_real(
        &mut self,
        bindings: HubBindings,
        module: &str,
        strategy: StrategyKind,
    ) -> Result<(), RegistryError> {
        match &self.state {
            BindingState::Unresolved => {}
            BindingState::Fallback => return Err(RegistryError::SettledOnFallback),
            BindingState::Real { module: bound, .. } => {
                return Err(RegistryError::AlreadyBound(bound.clone()))
            }
        }
        self.bindings = bindings;
        self.state = BindingState::Real {
            module: module.to_string(),
            strategy,
        };
        Ok(())
    }

    /// Record the resolver outcome. An unresolved registry settles on its stubs.
    /// A registry that already settled keeps its first report.
    pub fn finish(&mut self, report: ResolutionReport) {
        if self.state == BindingState::Unresolved {
            self.state = BindingState::Fallback;
        }
        if self.report.is_none() {
            self.report = Some(report);
        }
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self.state, BindingState::Real { .. })
    }

    pub fn report(&self) -> Option<&ResolutionReport> {
        self.report.as_ref()
    }

    pub fn data_hub_tab(&self) -> &dyn TabRenderer {
        self.bindings.data_hub_tab.as_ref()
    }

    pub fn system_management_tab(&self) -> &dyn TabRenderer {
        self.bindings.system_management_tab.as_ref()
    }

    pub fn hub_writer(&self) -> Arc<dyn HubWriter> {
        Arc::clone(&self.bindings.hub_writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::RenderContext;
    use crate::ui::Panel;

    struct Fixed(&'static str);

    impl TabRenderer for Fixed {
        fn render(&self, _ctx: &RenderContext) -> Panel {
            Panel::new().text(self.0)
        }
    }

    struct Accepting;

    impl HubWriter for Accepting {
        fn add_to_hub(&self, _title: &str, _content: &str, _category: &str) -> bool {
            true
        }
    }

    fn real() -> HubBindings {
        HubBindings {
            data_hub_tab: Arc::new(Fixed("hub")),
            system_management_tab: Arc::new(Fixed("admin")),
            hub_writer: Arc::new(Accepting),
        }
    }

    #[test]
    fn starts_unresolved_with_stubs_bound() {
        let registry = CapabilityRegistry::new(HubBindings::fallback("ai_factory_tabs", EnvInfo::default()));
        assert_eq!(registry.state(), &BindingState::Unresolved);
        assert!(!registry.hub_writer().add_to_hub("t", "c", "k"));
        assert!(registry.data_hub_tab().render(&RenderContext::default()).has_error());
    }

    #[test]
    fn real_binding_is_terminal() {
        let mut registry = CapabilityRegistry::new(HubBindings::fallback("m", EnvInfo::default()));
        registry
            .bind_real(real(), "web.ai_factory_tabs", StrategyKind::Qualified)
            .unwrap();
        let again = registry.bind_real(
            HubBindings::fallback("m", EnvInfo::default()),
            "other",
            StrategyKind::FilePath,
        );
        assert_eq!(
            again,
            Err(RegistryError::AlreadyBound("web.ai_factory_tabs".into()))
        );
        assert!(registry.hub_writer().add_to_hub("t", "c", "k"));

        registry.finish(ResolutionReport::default());
        assert!(!registry.is_degraded());
    }

    #[test]
    fn finish_without_bind_settles_on_fallback() {
        let mut registry = CapabilityRegistry::new(HubBindings::fallback("m", EnvInfo::default()));
        registry.finish(ResolutionReport::default());
        assert_eq!(registry.state(), &BindingState::Fallback);
        assert!(registry.is_degraded());
    }

    #[test]
    fn fallback_is_terminal_too() {
        let mut registry = CapabilityRegistry::new(HubBindings::fallback("m", EnvInfo::default()));
        registry.finish(ResolutionReport::default());
        assert_eq!(
            registry.bind_real(real(), "late", StrategyKind::FilePath),
            Err(RegistryError::SettledOnFallback)
        );
        assert_eq!(registry.state(), &BindingState::Fallback);
        assert!(!registry.hub_writer().add_to_hub("t", "c", "k"));
    }
}
