//! A tab extension backed by C ABI entry points.

use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

use factory_core::{
    HubEntryRequest, HubExtension, HubWriter, Panel, RenderContext, TabRenderer,
};
use libloading::Library;

use crate::error::PluginError;

/// C ABI: render(ctx_json) returns an allocated JSON `Panel` or null.
pub type RenderFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
/// C ABI: add(entry_json) returns whether the entry was stored.
pub type AddFn = unsafe extern "C" fn(*const c_char) -> bool;
/// C ABI: free a string returned by a render call.
pub type FreeFn = unsafe extern "C" fn(*mut c_char);

/// Entry points found in a library. Any of them may be missing.
#[derive(Clone, Copy, Default)]
pub struct HubSymbols {
    pub render_data_hub: Option<RenderFn>,
    pub render_system_management: Option<RenderFn>,
    pub add: Option<AddFn>,
    pub free: Option<FreeFn>,
}

/// Keeps the library mapped for as long as any capability handle is alive.
struct Loaded {
    symbols: HubSymbols,
    _lib: Option<Library>,
}

pub struct DynamicHubModule {
    name: String,
    inner: Arc<Loaded>,
}

impl DynamicHubModule {
    pub(crate) fn new(name: String, symbols: HubSymbols, lib: Option<Library>) -> Self {
        Self {
            name,
            inner: Arc::new(Loaded { symbols, _lib: lib }),
        }
    }

    /// Module from plain function pointers, without a backing library.
    pub fn from_symbols(name: impl Into<String>, symbols: HubSymbols) -> Self {
        Self::new(name.into(), symbols, None)
    }

    fn renderer(&self, render: Option<RenderFn>, tab: &'static str) -> Option<Arc<dyn TabRenderer>> {
        let render = render?;
        let free = self.inner.symbols.free?;
        Some(Arc::new(DynamicRenderer {
            module: self.name.clone(),
            tab,
            render,
            free,
            _keep: Arc::clone(&self.inner),
        }))
    }
}

impl HubExtension for DynamicHubModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn data_hub_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        self.renderer(self.inner.symbols.render_data_hub, "data hub")
    }

    fn system_management_tab(&self) -> Option<Arc<dyn TabRenderer>> {
        self.renderer(self.inner.symbols.render_system_management, "system management")
    }

    fn hub_writer(&self) -> Option<Arc<dyn HubWriter>> {
        let add = self.inner.symbols.add?;
        Some(Arc::new(DynamicHubWriter {
            module: self.name.clone(),
            add,
            _keep: Arc::clone(&self.inner),
        }))
    }
}

struct DynamicRenderer {
    module: String,
    tab: &'static str,
    render: RenderFn,
    free: FreeFn,
    _keep: Arc<Loaded>,
}

impl DynamicRenderer {
    fn call(&self, ctx: &RenderContext) -> Result<Panel, PluginError> {
        let ctx_json = CString::new(serde_json::to_string(ctx)?)?;
        let out_ptr = unsafe { (self.render)(ctx_json.as_ptr()) };
        if out_ptr.is_null() {
            return Err(PluginError::NullResult);
        }
        let out = unsafe {
            let s = CStr::from_ptr(out_ptr).to_string_lossy().into_owned();
            (self.free)(out_ptr);
            s
        };
        Ok(serde_json::from_str(&out)?)
    }
}

impl TabRenderer for DynamicRenderer {
    fn render(&self, ctx: &RenderContext) -> Panel {
        match self.call(ctx) {
            Ok(panel) => panel,
            Err(e) => {
                tracing::warn!("Extension `{}`: {} tab render failed: {}", self.module, self.tab, e);
                Panel::new().error(format!("Failed to render the {} tab: {}", self.tab, e))
            }
        }
    }
}

struct DynamicHubWriter {
    module: String,
    add: AddFn,
    _keep: Arc<Loaded>,
}

impl DynamicHubWriter {
    fn call(&self, entry: &HubEntryRequest) -> Result<bool, PluginError> {
        let entry_json = CString::new(serde_json::to_string(entry)?)?;
        Ok(unsafe { (self.add)(entry_json.as_ptr()) })
    }
}

impl HubWriter for DynamicHubWriter {
    fn add_to_hub(&self, title: &str, content: &str, category: &str) -> bool {
        let entry = HubEntryRequest {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
        };
        self.call(&entry).unwrap_or_else(|e| {
            tracing::warn!("Extension `{}`: add_to_hub failed: {}", self.module, e);
            false
        })
    }
}
