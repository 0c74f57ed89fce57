//! The bridge page as a JavaScript class.
//!
//! ```javascript
//! import init, { EtherLinkApp } from 'etherlink-wasm';
//!
//! await init();
//! const app = new EtherLinkApp(undefined, apiKey);
//! app.onChange(() => render(app.state()));
//! app.start();
//!
//! app.setAmount('1.5');
//! try {
//!     const tx = await app.bridge();
//! } catch (err) {
//!     if (err.kind === 'notConnected') openWalletPicker(app.providers());
//! }
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use etherlink::bridge::BridgeController;
use etherlink::config::BridgeSettings;
use etherlink::discovery::ProviderRegistry;
use etherlink::error::BridgeError;
use etherlink::estimate::{EstimationFailure, RouteEstimate, RouteEstimator, RouteQuery};
use etherlink::host::Host;
use etherlink::networks::{
    MOCK_GAS_HISTORY, NETWORKS, TOKENS, network_by_id, token_by_id, token_by_symbol,
};
use etherlink::provider::ProviderHandle;
use etherlink::session::WalletSession;
use etherlink_gemini::{GeminiConfig, GeminiEstimator};
use js_sys::{Function, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::console_warn;
use crate::discovery::WindowDiscovery;
use crate::host::{BrowserHost, BrowserTimer};
use crate::provider::legacy_provider;

/// The page's change callback.
#[derive(Default)]
struct Notifier {
    callback: RefCell<Option<Function>>,
}

impl Notifier {
    fn notify(&self) {
        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback
            && let Err(err) = callback.call0(&JsValue::NULL)
        {
            console_warn(&format!("onChange callback threw: {err:?}"));
        }
    }
}

/// Announces the analyzing state before the model is asked.
struct ObservedEstimator {
    inner: Rc<dyn RouteEstimator>,
    notifier: Rc<Notifier>,
}

#[async_trait(?Send)]
impl RouteEstimator for ObservedEstimator {
    async fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure> {
        self.notifier.notify();
        self.inner.estimate(query).await
    }
}

/// Stands in when no API key was given; every estimate falls back.
struct Unavailable(String);

#[async_trait(?Send)]
impl RouteEstimator for Unavailable {
    async fn estimate(&self, _query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure> {
        Err(EstimationFailure::new(self.0.clone()))
    }
}

fn route_estimator(api_key: Option<String>) -> Rc<dyn RouteEstimator> {
    match GeminiConfig::new(api_key.unwrap_or_default()).and_then(GeminiEstimator::try_new) {
        Ok(estimator) => Rc::new(estimator),
        Err(err) => {
            console_warn(&format!("Route estimates disabled: {err}"));
            Rc::new(Unavailable(err.to_string()))
        }
    }
}

struct AppInner {
    window: web_sys::Window,
    controller: BridgeController<ObservedEstimator, BrowserTimer>,
    registry: RefCell<Option<ProviderRegistry>>,
    notifier: Rc<Notifier>,
}

impl AppInner {
    fn find_provider(&self, uuid: &str) -> Option<ProviderHandle> {
        self.registry
            .borrow()
            .as_ref()
            .and_then(|registry| registry.find(uuid))
            .map(|detail| detail.provider)
    }

    fn session(&self) -> &WalletSession {
        self.controller.session()
    }
}

/// EtherLink bridge page state and actions.
#[wasm_bindgen]
pub struct EtherLinkApp {
    inner: Rc<AppInner>,
}

impl fmt::Debug for EtherLinkApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtherLinkApp")
            .field("controller", &self.inner.controller)
            .finish_non_exhaustive()
    }
}

#[wasm_bindgen]
impl EtherLinkApp {
    /// Creates the page state. `settings` is optional bridge settings JSON;
    /// without `api_key` every estimate is the fallback.
    ///
    /// # Errors
    ///
    /// Fails outside a browser window or on invalid settings.
    #[wasm_bindgen(constructor)]
    pub fn new(settings: Option<String>, api_key: Option<String>) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let settings = match settings {
            Some(json) => {
                BridgeSettings::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
            }
            None => BridgeSettings::default(),
        };

        let notifier = Rc::new(Notifier::default());
        let host: Rc<dyn Host> = Rc::new(BrowserHost::new(window.clone()));
        let session = WalletSession::with_message_limit(
            Rc::clone(&host),
            settings.error_message_limit,
        );
        let estimator = ObservedEstimator {
            inner: route_estimator(api_key),
            notifier: Rc::clone(&notifier),
        };
        let controller = BridgeController::new(session, host, &settings, estimator, BrowserTimer);

        Ok(Self {
            inner: Rc::new(AppInner {
                window,
                controller,
                registry: RefCell::new(None),
                notifier,
            }),
        })
    }

    /// Registers the callback run after every state change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        *self.inner.notifier.callback.borrow_mut() = Some(callback);
    }

    /// Starts wallet discovery and restores an already authorized legacy
    /// wallet. Later calls re-request announcements.
    pub fn start(&self) {
        if let Some(registry) = self.inner.registry.borrow().as_ref() {
            registry.refresh();
            return;
        }

        let notifier = Rc::clone(&self.inner.notifier);
        let channel = WindowDiscovery::new(self.inner.window.clone())
            .with_observer(Rc::new(move || notifier.notify()));
        let registry = ProviderRegistry::start(Rc::new(channel));
        *self.inner.registry.borrow_mut() = Some(registry);
        self.inner.notifier.notify();

        let inner = Rc::clone(&self.inner);
        spawn_local(async move {
            let legacy = legacy_provider(&inner.window);
            if inner.session().bootstrap(legacy).await.is_some() {
                inner.notifier.notify();
            }
        });
    }

    /// Discovered wallets as `{ uuid, name, icon, rdns }` objects.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn providers(&self) -> Result<JsValue, JsValue> {
        let infos = self
            .inner
            .registry
            .borrow()
            .as_ref()
            .map(ProviderRegistry::infos)
            .unwrap_or_default();
        to_js(&infos)
    }

    /// Connects the discovered wallet `uuid`, or `window.ethereum` when no uuid
    /// is given. Resolves with the account; rejects with the error text.
    pub fn connect(&self, uuid: Option<String>) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let provider = match uuid {
                Some(uuid) => inner.find_provider(&uuid),
                None => legacy_provider(&inner.window),
            };
            let result = inner.session().connect(provider).await;
            inner.notifier.notify();
            result
                .map(|account| JsValue::from_str(&account.to_string()))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Forgets the connected wallet.
    pub fn disconnect(&self) {
        self.inner.session().disconnect();
        self.inner.notifier.notify();
    }

    /// Dismisses the last connection error.
    #[wasm_bindgen(js_name = clearError)]
    pub fn clear_error(&self) {
        self.inner.session().clear_connect_error();
        self.inner.notifier.notify();
    }

    /// Updates the typed amount.
    #[wasm_bindgen(js_name = setAmount)]
    pub fn set_amount(&self, amount: String) {
        self.inner.controller.set_amount(amount);
        self.refresh_estimate();
    }

    /// Selects a token by id or symbol.
    ///
    /// # Errors
    ///
    /// Fails for an unknown token.
    #[wasm_bindgen(js_name = setToken)]
    pub fn set_token(&self, token: &str) -> Result<(), JsValue> {
        let token = token_by_id(token)
            .or_else(|| token_by_symbol(token))
            .ok_or_else(|| JsValue::from_str(&format!("Unknown token: {token}")))?;
        self.inner.controller.set_token(token);
        self.refresh_estimate();
        Ok(())
    }

    /// Selects the source network by id.
    ///
    /// # Errors
    ///
    /// Fails for an unknown network.
    #[wasm_bindgen(js_name = setFromNetwork)]
    pub fn set_from_network(&self, id: &str) -> Result<(), JsValue> {
        self.inner.controller.set_from_network(lookup_network(id)?);
        self.refresh_estimate();
        Ok(())
    }

    /// Selects the destination network by id.
    ///
    /// # Errors
    ///
    /// Fails for an unknown network.
    #[wasm_bindgen(js_name = setToNetwork)]
    pub fn set_to_network(&self, id: &str) -> Result<(), JsValue> {
        self.inner.controller.set_to_network(lookup_network(id)?);
        self.refresh_estimate();
        Ok(())
    }

    /// Exchanges source and destination networks.
    #[wasm_bindgen(js_name = swapNetworks)]
    pub fn swap_networks(&self) {
        self.inner.controller.swap_networks();
        self.refresh_estimate();
    }

    /// Runs the bridge action. Resolves with the new transaction record;
    /// rejects with `{ kind, message }`.
    pub fn bridge(&self) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let result = inner.controller.bridge().await;
            inner.notifier.notify();
            match result {
                Ok(record) => to_js(&record),
                Err(err) => Err(bridge_error(&err)),
            }
        })
    }

    /// Full page state: session, form, estimate and transactions.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.controller.snapshot())
    }
}

impl EtherLinkApp {
    fn refresh_estimate(&self) {
        self.inner.notifier.notify();
        let inner = Rc::clone(&self.inner);
        spawn_local(async move {
            inner.controller.refresh_estimate().await;
            inner.notifier.notify();
        });
    }
}

/// Supported networks.
///
/// # Errors
///
/// Fails only if serialization fails.
#[wasm_bindgen]
pub fn networks() -> Result<JsValue, JsValue> {
    to_js(&NETWORKS)
}

/// Supported tokens.
///
/// # Errors
///
/// Fails only if serialization fails.
#[wasm_bindgen]
pub fn tokens() -> Result<JsValue, JsValue> {
    to_js(&TOKENS)
}

/// Sample gas prices for the dashboard chart.
///
/// # Errors
///
/// Fails only if serialization fails.
#[wasm_bindgen(js_name = gasHistory)]
pub fn gas_history() -> Result<JsValue, JsValue> {
    to_js(&MOCK_GAS_HISTORY)
}

fn lookup_network(id: &str) -> Result<&'static etherlink::networks::NetworkInfo, JsValue> {
    network_by_id(id).ok_or_else(|| JsValue::from_str(&format!("Unknown network: {id}")))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

#[derive(Serialize)]
struct JsBridgeError {
    kind: &'static str,
    message: String,
}

fn bridge_error(err: &BridgeError) -> JsValue {
    let kind = match err {
        BridgeError::NotConnected => "notConnected",
        BridgeError::Busy => "busy",
        BridgeError::InvalidAmount(_) => "invalidAmount",
        BridgeError::ChainSwitch(_) => "chainSwitch",
        BridgeError::Submission(_) => "submission",
    };
    let payload = JsBridgeError {
        kind,
        message: err.to_string(),
    };
    to_js(&payload).unwrap_or_else(|_| JsValue::from_str(&payload.message))
}
