//! ai_factory_tabs: the Universal Data Hub tab extension.
//!
//! Built as an `rlib` (registered in the dashboard's module catalog behind its
//! `bundled-hub` feature) and as a `cdylib` exporting the C ABI the dashboard's
//! search-path and direct file-path strategies load.

mod ffi;
mod module;
mod store;
mod tabs;

pub use ffi::{
    factory_hub_add, factory_hub_free, factory_hub_render_data_hub,
    factory_hub_render_system_management,
};
pub use module::{hub_path, HubModule, DEFAULT_HUB_PATH, HUB_PATH_ENV, MODULE_NAME};
pub use store::{HubEntry, HubError, HubStore};
pub use tabs::{DataHubTab, StoreWriter, SystemManagementTab};
