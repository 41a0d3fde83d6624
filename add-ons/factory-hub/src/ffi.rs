//! C ABI exports for the `cdylib` build (symbol names in `factory_core::abi`).
//!
//! The hub is opened on first call and kept for the life of the process.

use std::ffi::{c_char, CStr, CString};
use std::sync::OnceLock;

use factory_core::{HubEntryRequest, HubExtension, Panel, RenderContext};

use crate::module::{hub_path, HubModule};

static HUB: OnceLock<Result<HubModule, String>> = OnceLock::new();

fn hub() -> Result<&'static HubModule, &'static str> {
    HUB.get_or_init(|| {
        HubModule::open(hub_path()).map_err(|e| {
            tracing::warn!("Universal Data Hub unavailable: {}", e);
            e.to_string()
        })
    })
    .as_ref()
    .map_err(String::as_str)
}

/// Null or malformed input yields the default context.
unsafe fn read_context(ctx_json: *const c_char) -> RenderContext {
    if ctx_json.is_null() {
        return RenderContext::default();
    }
    let raw = CStr::from_ptr(ctx_json).to_string_lossy();
    serde_json::from_str(&raw).unwrap_or_default()
}

fn into_raw(panel: &Panel) -> *mut c_char {
    serde_json::to_string(panel)
        .ok()
        .and_then(|s| CString::new(s).ok())
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

fn render_with<F>(ctx_json: *const c_char, pick: F) -> *mut c_char
where
    F: Fn(&HubModule, &RenderContext) -> Option<Panel>,
{
    let ctx = unsafe { read_context(ctx_json) };
    let panel = match hub() {
        Ok(module) => pick(module, &ctx)
            .unwrap_or_else(|| Panel::new().error("Tab not provided by this module.")),
        Err(e) => Panel::new().error(format!("Universal Data Hub unavailable: {}", e)),
    };
    into_raw(&panel)
}

/// # Safety
/// `ctx_json` is null or a NUL-terminated string. Free the result with `factory_hub_free`.
#[no_mangle]
pub unsafe extern "C" fn factory_hub_render_data_hub(ctx_json: *const c_char) -> *mut c_char {
    render_with(ctx_json, |m, ctx| m.data_hub_tab().map(|t| t.render(ctx)))
}

/// # Safety
/// `ctx_json` is null or a NUL-terminated string. Free the result with `factory_hub_free`.
#[no_mangle]
pub unsafe extern "C" fn factory_hub_render_system_management(
    ctx_json: *const c_char,
) -> *mut c_char {
    render_with(ctx_json, |m, ctx| m.system_management_tab().map(|t| t.render(ctx)))
}

/// # Safety
/// `entry_json` is null or a NUL-terminated JSON `HubEntryRequest`.
#[no_mangle]
pub unsafe extern "C" fn factory_hub_add(entry_json: *const c_char) -> bool {
    if entry_json.is_null() {
        return false;
    }
    let raw = CStr::from_ptr(entry_json).to_string_lossy();
    let entry: HubEntryRequest = match serde_json::from_str(&raw) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!("factory_hub_add: invalid entry: {}", e);
            return false;
        }
    };
    match hub() {
        Ok(module) => module
            .hub_writer()
            .map(|w| w.add_to_hub(&entry.title, &entry.content, &entry.category))
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// # Safety
/// `ptr` is null or was returned by one of the render functions and not freed yet.
#[no_mangle]
pub unsafe extern "C" fn factory_hub_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_garbage_inputs_are_tolerated() {
        unsafe {
            assert!(!read_context(std::ptr::null()).show_diagnostics);
            let garbage = CString::new("{oops").unwrap();
            assert!(!read_context(garbage.as_ptr()).show_diagnostics);
            let on = CString::new(r#"{"show_diagnostics":true}"#).unwrap();
            assert!(read_context(on.as_ptr()).show_diagnostics);

            assert!(!factory_hub_add(std::ptr::null()));
            let bad = CString::new("not an entry").unwrap();
            assert!(!factory_hub_add(bad.as_ptr()));
            factory_hub_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn panels_cross_the_boundary_as_json() {
        let panel = Panel::new().heading("Universal Data Hub");
        let raw = into_raw(&panel);
        assert!(!raw.is_null());
        let back: Panel =
            unsafe { serde_json::from_str(&CStr::from_ptr(raw).to_string_lossy()).unwrap() };
        unsafe { factory_hub_free(raw) };
        assert_eq!(back, panel);
    }
}
