//! The connected wallet.
//!
//! A [`WalletSession`] holds at most one provider and its active account. The
//! two are always set and cleared together. While connected, the session keeps
//! exactly one pair of `accountsChanged` / `chainChanged` handlers registered
//! on the provider; switching providers or disconnecting removes the very
//! handler instances that were registered before anything else changes.
//!
//! Handlers hold a weak reference to the session and the epoch they were
//! created in, so a handler that outlives its registration (a provider that
//! ignores `removeListener`, or an event already being dispatched) does nothing.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use alloy_primitives::Address;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DEFAULT_MESSAGE_LIMIT, WalletError};
use crate::host::Host;
use crate::provider::{
    ETH_ACCOUNTS, ETH_REQUEST_ACCOUNTS, EventHandler, ProviderEvent, ProviderHandle,
    RequestArguments,
};

/// Formats an address as `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Serializable view of the session for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// A provider and account are held
    pub connected: bool,
    /// An account request is in flight
    pub connecting: bool,
    /// Checksummed active account
    pub account: Option<String>,
    /// Shortened active account
    pub short_account: Option<String>,
    /// Last connect error, as shown to the user
    pub error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    provider: Option<ProviderHandle>,
    account: Option<Address>,
    connect_error: Option<WalletError>,
}

struct ListenerSet {
    provider: ProviderHandle,
    accounts_changed: EventHandler,
    chain_changed: EventHandler,
}

struct SessionInner {
    state: RefCell<SessionState>,
    listeners: RefCell<Option<ListenerSet>>,
    epoch: Cell<u64>,
    connecting: Cell<usize>,
    host: Rc<dyn Host>,
    message_limit: usize,
}

impl SessionInner {
    fn adopt(self: &Rc<Self>, provider: ProviderHandle, account: Address) {
        self.detach();
        {
            let mut state = self.state.borrow_mut();
            state.provider = Some(Rc::clone(&provider));
            state.account = Some(account);
            state.connect_error = None;
        }
        self.attach(provider);
    }

    fn attach(self: &Rc<Self>, provider: ProviderHandle) {
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);

        let weak = Rc::downgrade(self);
        let accounts_changed = EventHandler::new(move |payload| {
            if let Some(inner) = live(&weak, epoch) {
                inner.on_accounts_changed(payload);
            }
        });
        let weak = Rc::downgrade(self);
        let chain_changed = EventHandler::new(move |payload| {
            if let Some(inner) = live(&weak, epoch) {
                inner.on_chain_changed(payload);
            }
        });

        provider.on(ProviderEvent::AccountsChanged, accounts_changed.clone());
        provider.on(ProviderEvent::ChainChanged, chain_changed.clone());
        self.listeners.replace(Some(ListenerSet {
            provider,
            accounts_changed,
            chain_changed,
        }));
    }

    fn detach(&self) {
        self.epoch.set(self.epoch.get() + 1);
        let Some(set) = self.listeners.borrow_mut().take() else {
            return;
        };
        set.provider
            .remove_listener(ProviderEvent::AccountsChanged, &set.accounts_changed);
        set.provider
            .remove_listener(ProviderEvent::ChainChanged, &set.chain_changed);
    }

    fn disconnect(&self) {
        self.detach();
        let mut state = self.state.borrow_mut();
        state.provider = None;
        state.account = None;
    }

    fn on_accounts_changed(&self, payload: &Value) {
        match first_account(payload) {
            Ok(Some(account)) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(%account, "Active account changed");
                let mut state = self.state.borrow_mut();
                state.account = Some(account);
                state.connect_error = None;
            }
            Ok(None) => {
                #[cfg(feature = "telemetry")]
                tracing::info!("Wallet reported no accounts, disconnecting");
                self.disconnect();
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, %payload, "Ignoring malformed accountsChanged payload");
                #[cfg(not(feature = "telemetry"))]
                let _ = err;
            }
        }
    }

    fn on_chain_changed(&self, payload: &Value) {
        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %payload, "Wallet chain changed, reloading");
        #[cfg(not(feature = "telemetry"))]
        let _ = payload;
        self.disconnect();
        self.host.reload();
    }
}

fn live(weak: &Weak<SessionInner>, epoch: u64) -> Option<Rc<SessionInner>> {
    weak.upgrade().filter(|inner| inner.epoch.get() == epoch)
}

/// Reads the first account of an `eth_accounts`-shaped answer.
fn first_account(value: &Value) -> Result<Option<Address>, WalletError> {
    let accounts = value
        .as_array()
        .ok_or_else(|| WalletError::connection("Wallet returned malformed accounts"))?;
    let Some(first) = accounts.first() else {
        return Ok(None);
    };
    first
        .as_str()
        .and_then(|s| Address::from_str(s).ok())
        .map(Some)
        .ok_or_else(|| WalletError::connection("Wallet returned an invalid account"))
}

/// Connection state shared by everything that needs the wallet.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Rc<SessionInner>,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("account", &self.account())
            .field("connecting", &self.is_connecting())
            .field("connect_error", &self.connect_error())
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Creates a disconnected session.
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self::with_message_limit(host, DEFAULT_MESSAGE_LIMIT)
    }

    /// Creates a disconnected session that shows wallet messages up to
    /// `message_limit` characters.
    pub fn with_message_limit(host: Rc<dyn Host>, message_limit: usize) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                state: RefCell::new(SessionState::default()),
                listeners: RefCell::new(None),
                epoch: Cell::new(0),
                connecting: Cell::new(0),
                host,
                message_limit,
            }),
        }
    }

    /// Requests accounts from `provider` and, on success, makes it the active
    /// provider.
    ///
    /// The error is also kept as [`connect_error`](Self::connect_error) until
    /// the next connect attempt or account change.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError`] when no provider was given or the wallet
    /// refuses, fails, or returns no accounts. The session is left unchanged.
    pub async fn connect(&self, provider: Option<ProviderHandle>) -> Result<Address, WalletError> {
        self.clear_connect_error();
        let Some(provider) = provider else {
            return Err(self.fail(WalletError::NoProvider));
        };

        let response = {
            let _pending = PendingConnect::enter(&self.inner.connecting);
            provider
                .request(RequestArguments::new(ETH_REQUEST_ACCOUNTS))
                .await
        };

        let account = match response {
            Ok(value) => match first_account(&value) {
                Ok(Some(account)) => account,
                Ok(None) => return Err(self.fail(WalletError::connection("No accounts found"))),
                Err(err) => return Err(self.fail(err)),
            },
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(code = err.code, error = %err, "Wallet connection failed");
                return Err(self.fail(WalletError::from_provider(
                    &err,
                    self.inner.message_limit,
                )));
            }
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(%account, "Wallet connected");
        self.inner.adopt(provider, account);
        Ok(account)
    }

    /// Forgets the provider and account after removing the event handlers.
    pub fn disconnect(&self) {
        #[cfg(feature = "telemetry")]
        tracing::info!("Wallet disconnected");
        self.inner.disconnect();
    }

    /// Silently adopts an already-authorized legacy provider.
    ///
    /// Uses `eth_accounts`, which never prompts. Does nothing when a session is
    /// already active, including one established while the query was in flight.
    pub async fn bootstrap(&self, legacy: Option<ProviderHandle>) -> Option<Address> {
        let provider = legacy?;
        if self.is_connected() {
            return None;
        }

        let account = match provider.request(RequestArguments::new(ETH_ACCOUNTS)).await {
            Ok(value) => first_account(&value).ok().flatten()?,
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(error = %err, "Legacy provider account check failed");
                #[cfg(not(feature = "telemetry"))]
                let _ = err;
                return None;
            }
        };
        if self.is_connected() {
            return None;
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(%account, "Adopted already-authorized legacy provider");
        self.inner.adopt(provider, account);
        Some(account)
    }

    /// Clears the stored connect error, e.g. when the wallet picker reopens.
    pub fn clear_connect_error(&self) {
        self.inner.state.borrow_mut().connect_error = None;
    }

    /// Returns `true` when a provider and account are held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().account.is_some()
    }

    /// Returns `true` while an account request is awaiting the wallet.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.get() > 0
    }

    /// Active account.
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        self.inner.state.borrow().account
    }

    /// Active provider.
    #[must_use]
    pub fn provider(&self) -> Option<ProviderHandle> {
        self.inner.state.borrow().provider.clone()
    }

    /// Last connect error.
    #[must_use]
    pub fn connect_error(&self) -> Option<WalletError> {
        self.inner.state.borrow().connect_error.clone()
    }

    /// Current state for display.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.borrow();
        SessionSnapshot {
            connected: state.account.is_some(),
            connecting: self.is_connecting(),
            account: state.account.as_ref().map(ToString::to_string),
            short_account: state.account.as_ref().map(short_address),
            error: state.connect_error.as_ref().map(ToString::to_string),
        }
    }

    fn fail(&self, err: WalletError) -> WalletError {
        self.inner.state.borrow_mut().connect_error = Some(err.clone());
        err
    }
}

/// Counts an account request for as long as it is awaited, including when
/// the connect future is dropped early.
struct PendingConnect<'a>(&'a Cell<usize>);

impl<'a> PendingConnect<'a> {
    fn enter(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
