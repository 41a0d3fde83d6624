//! Capability traits for the optional tab extension and the names it binds under.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ui::Panel;

/// Per-interaction render inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderContext {
    /// User ticked the "show diagnostic information" control.
    #[serde(default)]
    pub show_diagnostics: bool,
}

/// Renders one dashboard tab.
pub trait TabRenderer: Send + Sync {
    fn render(&self, ctx: &RenderContext) -> Panel;
}

/// Adds an item to the Universal Data Hub. Returns false instead of failing.
pub trait HubWriter: Send + Sync {
    fn add_to_hub(&self, title: &str, content: &str, category: &str) -> bool;
}

/// Payload of one `add_to_hub` call (also the JSON argument of the C ABI entry point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEntryRequest {
    pub title: String,
    pub content: String,
    pub category: String,
}

/// A loaded extension module. Each accessor returns `None` when the module
/// does not export that capability.
pub trait HubExtension: Send + Sync {
    /// Identifier of the loaded module (logical name or file path), for logs.
    fn name(&self) -> &str;
    fn data_hub_tab(&self) -> Option<Arc<dyn TabRenderer>>;
    fn system_management_tab(&self) -> Option<Arc<dyn TabRenderer>>;
    fn hub_writer(&self) -> Option<Arc<dyn HubWriter>>;
}

/// The binding targets an extension must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubCapability {
    DataHubTab,
    SystemManagementTab,
    AddToHub,
}

impl HubCapability {
    /// Process-wide binding name.
    pub fn binding_name(self) -> &'static str {
        match self {
            HubCapability::DataHubTab => "render_universal_data_hub_tab",
            HubCapability::SystemManagementTab => "render_system_management_tab",
            HubCapability::AddToHub => "add_to_hub",
        }
    }
}

impl fmt::Display for HubCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binding_name())
    }
}

/// C ABI exported by the dynamic-library build of the tab extension.
///
/// - `render_*(ctx_json: *const c_char) -> *mut c_char` returns a JSON `Panel`
///   allocated by the library (null on error).
/// - `add(entry_json: *const c_char) -> bool` takes a JSON [`HubEntryRequest`].
/// - `free(ptr: *mut c_char)` releases strings returned by the render calls.
pub mod abi {
    pub const RENDER_DATA_HUB: &[u8] = b"factory_hub_render_data_hub\0";
    pub const RENDER_SYSTEM_MANAGEMENT: &[u8] = b"factory_hub_render_system_management\0";
    pub const ADD_TO_HUB: &[u8] = b"factory_hub_add\0";
    pub const FREE: &[u8] = b"factory_hub_free\0";
}
