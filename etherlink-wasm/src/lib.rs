#![allow(clippy::future_not_send)]

//! Browser bindings for the EtherLink bridge.
//!
//! - [`provider::JsProvider`] - EIP-1193 over an injected provider object
//! - [`discovery::WindowDiscovery`] - EIP-6963 announce/request on `window`
//! - [`host::BrowserHost`], [`host::BrowserTimer`] - Page reload, clock and `setTimeout`
//! - [`app::EtherLinkApp`] - The bridge page exported to JavaScript

use wasm_bindgen::prelude::*;

pub mod app;
pub mod discovery;
pub mod host;
pub mod provider;

pub use app::EtherLinkApp;

#[cfg(test)]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

/// Installs the panic hook.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Logs a warning to the browser console.
pub(crate) fn console_warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}
