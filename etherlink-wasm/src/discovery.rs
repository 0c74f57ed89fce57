//! EIP-6963 discovery over `window` events.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use etherlink::discovery::{
    ANNOUNCE_PROVIDER_EVENT, AnnounceListener, DiscoveryChannel, ListenerId, ProviderDetail,
    ProviderInfo, REQUEST_PROVIDER_EVENT,
};
use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Event, Window};

use crate::console_warn;
use crate::provider::JsProvider;

type AnnounceClosure = Closure<dyn FnMut(Event)>;

/// Announce/request handshake on the page's `window`.
pub struct WindowDiscovery {
    window: Window,
    listeners: RefCell<HashMap<ListenerId, AnnounceClosure>>,
    next_id: Cell<u64>,
    observer: Option<Rc<dyn Fn()>>,
}

impl fmt::Debug for WindowDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowDiscovery")
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

impl WindowDiscovery {
    /// Discovery on `window`.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self {
            window,
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            observer: None,
        }
    }

    /// Calls `observer` after each announcement is delivered.
    #[must_use]
    pub fn with_observer(mut self, observer: Rc<dyn Fn()>) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl DiscoveryChannel for WindowDiscovery {
    fn add_announce_listener(&self, listener: AnnounceListener) -> ListenerId {
        let id = ListenerId::new(self.next_id.get());
        self.next_id.set(id.get() + 1);

        let observer = self.observer.clone();
        let closure = AnnounceClosure::new(move |event: Event| {
            match parse_announcement(&event) {
                Ok(detail) => listener.call(detail),
                Err(err) => {
                    console_warn(&format!("Ignoring malformed provider announcement: {err:?}"));
                    return;
                }
            }
            if let Some(observer) = &observer {
                observer();
            }
        });
        if let Err(err) = self.window.add_event_listener_with_callback(
            ANNOUNCE_PROVIDER_EVENT,
            closure.as_ref().unchecked_ref(),
        ) {
            console_warn(&format!("Failed to subscribe to announcements: {err:?}"));
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn remove_announce_listener(&self, id: ListenerId) {
        let Some(closure) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        if let Err(err) = self.window.remove_event_listener_with_callback(
            ANNOUNCE_PROVIDER_EVENT,
            closure.as_ref().unchecked_ref(),
        ) {
            console_warn(&format!("Failed to unsubscribe from announcements: {err:?}"));
        }
    }

    fn request_providers(&self) {
        let dispatched = Event::new(REQUEST_PROVIDER_EVENT)
            .and_then(|event| self.window.dispatch_event(&event));
        if let Err(err) = dispatched {
            console_warn(&format!("Failed to request providers: {err:?}"));
        }
    }
}

fn parse_announcement(event: &Event) -> Result<ProviderDetail, JsValue> {
    let detail = event
        .dyn_ref::<CustomEvent>()
        .ok_or_else(|| JsValue::from_str("not a CustomEvent"))?
        .detail();
    let info: ProviderInfo =
        serde_wasm_bindgen::from_value(Reflect::get(&detail, &JsValue::from_str("info"))?)?;
    let provider = Reflect::get(&detail, &JsValue::from_str("provider"))?;
    if !provider.is_object() {
        return Err(JsValue::from_str("announcement has no provider"));
    }
    Ok(ProviderDetail {
        info,
        provider: JsProvider::handle(provider),
    })
}
