//! factory-plugin: dynamic-library loading of the Universal Data Hub tab extension.
//!
//! ## Contract for the extension (cdylib)
//!
//! The library exports (see [`factory_core::abi`]):
//! - `factory_hub_render_data_hub(ctx_json: *const c_char) -> *mut c_char`
//! - `factory_hub_render_system_management(ctx_json: *const c_char) -> *mut c_char`
//!   Both return an allocated JSON `Panel`, null on error.
//! - `factory_hub_add(entry_json: *const c_char) -> bool`
//! - `factory_hub_free(ptr: *mut c_char)` frees strings returned by the render calls.

mod error;
mod loader;
mod module;

pub use error::PluginError;
pub use loader::DylibLoader;
pub use module::{AddFn, DynamicHubModule, FreeFn, HubSymbols, RenderFn};
