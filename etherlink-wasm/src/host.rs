//! Page reload, clock and timers from the browser.

use std::time::Duration;

use async_trait::async_trait;
use etherlink::estimate::Timer;
use etherlink::host::Host;
use js_sys::Promise;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

use crate::console_warn;

/// [`Host`] backed by `window.location` and `Date.now`.
#[derive(Debug, Clone)]
pub struct BrowserHost {
    window: Window,
}

impl BrowserHost {
    /// Host for `window`.
    #[must_use]
    pub const fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Host for BrowserHost {
    fn reload(&self) {
        if let Err(err) = self.window.location().reload() {
            console_warn(&format!("Page reload failed: {err:?}"));
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn now_millis(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// [`Timer`] backed by `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

#[async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().map(|window| {
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            });
            if !matches!(scheduled, Some(Ok(_))) {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}
