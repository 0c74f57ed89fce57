//! Scriptable test doubles for providers, discovery, the host and estimators.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::discovery::{
    AnnounceListener, DiscoveryChannel, ListenerId, ProviderDetail, ProviderInfo,
};
use crate::estimate::{EstimationFailure, RiskScore, RouteEstimate, RouteEstimator, RouteQuery};
use crate::host::Host;
use crate::provider::{
    Eip1193Provider, EventHandler, ProviderEvent, ProviderHandle, ProviderRpcError,
    RequestArguments,
};

type Response = Result<Value, ProviderRpcError>;

/// EIP-1193 provider with canned responses per method.
///
/// Unscripted methods fail with `4200 unsupported method`.
#[derive(Default)]
pub(crate) struct MockProvider {
    sticky: RefCell<HashMap<String, Response>>,
    queued: RefCell<HashMap<String, VecDeque<Response>>>,
    delays: RefCell<HashMap<String, Duration>>,
    calls: RefCell<Vec<RequestArguments>>,
    listeners: RefCell<Vec<(ProviderEvent, EventHandler)>>,
    removed: Cell<usize>,
    ignore_removals: Cell<bool>,
}

impl MockProvider {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn handle(self: &Rc<Self>) -> ProviderHandle {
        Rc::<Self>::clone(self)
    }

    /// Answers every call to `method` with `response`.
    pub(crate) fn respond(&self, method: &str, response: Response) {
        self.sticky.borrow_mut().insert(method.to_owned(), response);
    }

    /// Answers the next call to `method` with `response`, ahead of any sticky answer.
    pub(crate) fn respond_once(&self, method: &str, response: Response) {
        self.queued
            .borrow_mut()
            .entry(method.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Delays every answer to `method`.
    pub(crate) fn delay(&self, method: &str, delay: Duration) {
        self.delays.borrow_mut().insert(method.to_owned(), delay);
    }

    /// Makes `remove_listener` a no-op, like a provider that leaks listeners.
    pub(crate) fn ignore_removals(&self) {
        self.ignore_removals.set(true);
    }

    pub(crate) fn calls(&self) -> Vec<RequestArguments> {
        self.calls.borrow().clone()
    }

    pub(crate) fn calls_to(&self, method: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub(crate) fn listener_count(&self, event: ProviderEvent) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(e, _)| *e == event)
            .count()
    }

    pub(crate) fn removed_count(&self) -> usize {
        self.removed.get()
    }

    /// Dispatches an event to a snapshot of the current listeners.
    pub(crate) fn emit(&self, event: ProviderEvent, payload: &Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler.call(payload);
        }
    }

    fn next_response(&self, method: &str) -> Response {
        if let Some(response) = self
            .queued
            .borrow_mut()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        self.sticky.borrow().get(method).cloned().unwrap_or_else(|| {
            Err(ProviderRpcError::new(
                ProviderRpcError::UNSUPPORTED_METHOD,
                format!("{method} is not supported"),
            ))
        })
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for MockProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        let method = args.method.clone();
        self.calls.borrow_mut().push(args);
        let delay = self.delays.borrow().get(&method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response(&method)
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        self.listeners.borrow_mut().push((event, handler));
    }

    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler) {
        if self.ignore_removals.get() {
            return;
        }
        let mut listeners = self.listeners.borrow_mut();
        if let Some(pos) = listeners
            .iter()
            .position(|(e, h)| *e == event && h == handler)
        {
            listeners.remove(pos);
            self.removed.set(self.removed.get() + 1);
        }
    }
}

/// Host that counts reloads and reports a settable clock.
pub(crate) struct RecordingHost {
    reloads: Cell<usize>,
    now: Cell<u64>,
}

impl RecordingHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            reloads: Cell::new(0),
            now: Cell::new(1_700_000_000_000),
        })
    }

    pub(crate) fn as_host(self: &Rc<Self>) -> Rc<dyn Host> {
        Rc::<Self>::clone(self)
    }

    pub(crate) fn reloads(&self) -> usize {
        self.reloads.get()
    }
}

impl Host for RecordingHost {
    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }

    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// Discovery channel whose registered wallets answer every provider request.
#[derive(Default)]
pub(crate) struct ManualDiscovery {
    listeners: RefCell<Vec<(ListenerId, AnnounceListener)>>,
    wallets: RefCell<Vec<ProviderDetail>>,
    next_id: Cell<u64>,
    requests: Cell<usize>,
    removals: Cell<usize>,
}

impl ManualDiscovery {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn as_channel(self: &Rc<Self>) -> Rc<dyn DiscoveryChannel> {
        Rc::<Self>::clone(self)
    }

    /// Adds a wallet that announces itself on each provider request.
    pub(crate) fn register(&self, detail: ProviderDetail) {
        self.wallets.borrow_mut().push(detail);
    }

    /// Delivers an unsolicited announcement.
    pub(crate) fn announce(&self, detail: ProviderDetail) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener.call(detail.clone());
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.get()
    }

    pub(crate) fn removal_count(&self) -> usize {
        self.removals.get()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl DiscoveryChannel for ManualDiscovery {
    fn add_announce_listener(&self, listener: AnnounceListener) -> ListenerId {
        let id = ListenerId::new(self.next_id.get());
        self.next_id.set(id.get() + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_announce_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        if listeners.len() != before {
            self.removals.set(self.removals.get() + 1);
        }
    }

    fn request_providers(&self) {
        self.requests.set(self.requests.get() + 1);
        let wallets = self.wallets.borrow().clone();
        for wallet in wallets {
            self.announce(wallet);
        }
    }
}

/// A discovered wallet backed by a fresh [`MockProvider`].
pub(crate) fn wallet(uuid: &str, name: &str) -> ProviderDetail {
    ProviderDetail {
        info: ProviderInfo {
            uuid: uuid.to_owned(),
            name: name.to_owned(),
            icon: "data:image/svg+xml;base64,PHN2Zy8+".to_owned(),
            rdns: format!("io.{}", name.to_lowercase().replace(' ', "")),
        },
        provider: MockProvider::new().handle(),
    }
}

pub(crate) fn sample_estimate() -> RouteEstimate {
    RouteEstimate {
        estimated_gas: "0.0021".into(),
        estimated_time: "5".into(),
        risk_score: RiskScore::Medium,
        message: "Moderate congestion on the destination chain.".into(),
    }
}

type EstimateResponse = (Duration, Result<RouteEstimate, String>);

/// Estimator answering from a queue, then with [`sample_estimate`].
#[derive(Clone, Default)]
pub(crate) struct MockEstimator {
    responses: Rc<RefCell<VecDeque<EstimateResponse>>>,
    queries: Rc<RefCell<Vec<RouteQuery>>>,
}

impl MockEstimator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, delay: Duration, result: Result<RouteEstimate, String>) {
        self.responses.borrow_mut().push_back((delay, result));
    }

    pub(crate) fn queries(&self) -> Vec<RouteQuery> {
        self.queries.borrow().clone()
    }
}

#[async_trait(?Send)]
impl RouteEstimator for MockEstimator {
    async fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure> {
        self.queries.borrow_mut().push(query.clone());
        let next = self.responses.borrow_mut().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(sample_estimate())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result.map_err(EstimationFailure::new)
    }
}
