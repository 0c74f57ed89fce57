//! [`Eip1193Provider`] over an injected JavaScript provider object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use etherlink::provider::{
    Eip1193Provider, EventHandler, ProviderEvent, ProviderHandle, ProviderRpcError,
    RequestArguments,
};
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::console_warn;

struct Subscription {
    event: ProviderEvent,
    handler: EventHandler,
    closure: Closure<dyn FnMut(JsValue)>,
}

/// A wallet's `request`/`on`/`removeListener` object.
pub struct JsProvider {
    object: JsValue,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl fmt::Debug for JsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsProvider")
            .field("subscriptions", &self.subscriptions.borrow().len())
            .finish_non_exhaustive()
    }
}

impl JsProvider {
    /// Wraps a provider object.
    #[must_use]
    pub fn new(object: JsValue) -> Self {
        Self {
            object,
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// Wraps a provider object as a shared handle.
    #[must_use]
    pub fn handle(object: JsValue) -> ProviderHandle {
        Rc::new(Self::new(object))
    }

    fn method(&self, name: &str) -> Result<Function, JsValue> {
        Reflect::get(&self.object, &JsValue::from_str(name))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str(&format!("provider has no {name} method")))
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        let result = self.method("removeListener").and_then(|remove| {
            remove.call2(
                &self.object,
                &JsValue::from_str(subscription.event.as_str()),
                subscription.closure.as_ref(),
            )
        });
        if let Err(err) = result {
            console_warn(&format!(
                "removeListener({}) failed: {err:?}",
                subscription.event
            ));
        }
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for JsProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        let js_args = args
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| internal_error(&e.to_string()))?;
        let request = self.method("request").map_err(|e| rpc_error(&e))?;
        let pending = request
            .call1(&self.object, &js_args)
            .map_err(|e| rpc_error(&e))?;
        let result = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(|e| rpc_error(&e))?;
        if result.is_undefined() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| internal_error(&e.to_string()))
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        let callback = handler.clone();
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            let payload = serde_wasm_bindgen::from_value(payload).unwrap_or(Value::Null);
            callback.call(&payload);
        });
        let result = self.method("on").and_then(|on| {
            on.call2(
                &self.object,
                &JsValue::from_str(event.as_str()),
                closure.as_ref(),
            )
        });
        if let Err(err) = result {
            console_warn(&format!("on({event}) failed: {err:?}"));
            return;
        }
        self.subscriptions.borrow_mut().push(Subscription {
            event,
            handler,
            closure,
        });
    }

    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler) {
        let removed = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            subscriptions
                .iter()
                .position(|s| s.event == event && &s.handler == handler)
                .map(|pos| subscriptions.remove(pos))
        };
        let Some(subscription) = removed else {
            return;
        };
        self.unsubscribe(&subscription);
        // The listener may be the one currently dispatching; free it after this turn.
        wasm_bindgen_futures::spawn_local(async move {
            drop(subscription);
        });
    }
}

impl Drop for JsProvider {
    fn drop(&mut self) {
        let subscriptions = std::mem::take(self.subscriptions.get_mut());
        for subscription in &subscriptions {
            self.unsubscribe(subscription);
        }
    }
}

/// The legacy injected provider, `window.ethereum`.
#[must_use]
pub fn legacy_provider(window: &web_sys::Window) -> Option<ProviderHandle> {
    let object = Reflect::get(window, &JsValue::from_str("ethereum")).ok()?;
    if object.is_undefined() || object.is_null() {
        return None;
    }
    Some(JsProvider::handle(object))
}

/// Reads `{ code, message, data }` from a thrown or rejected value.
#[allow(clippy::cast_possible_truncation)]
fn rpc_error(err: &JsValue) -> ProviderRpcError {
    let field = |name: &str| Reflect::get(err, &JsValue::from_str(name)).ok();
    let code = field("code")
        .and_then(|c| c.as_f64())
        .map_or(ProviderRpcError::INTERNAL_ERROR, |c| c as i64);
    let message = field("message")
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string());
    let data = field("data")
        .filter(|d| !d.is_undefined() && !d.is_null())
        .and_then(|d| serde_wasm_bindgen::from_value(d).ok());
    ProviderRpcError {
        code,
        message,
        data,
    }
}

fn internal_error(message: &str) -> ProviderRpcError {
    ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, message)
}
