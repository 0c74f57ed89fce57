//! EIP-1193 provider capability.
//!
//! Every wallet the bridge talks to, whether announced through EIP-6963 discovery
//! or injected as the legacy `window.ethereum` object, is reached through the
//! [`Eip1193Provider`] trait defined here.
//!
//! - [`RequestArguments`] - The `{ method, params }` object passed to `request`
//! - [`ProviderRpcError`] - Structured provider error with its numeric code
//! - [`ProviderEvent`] - The notifications the session subscribes to
//! - [`EventHandler`] - A listener whose identity survives cloning, so the exact
//!   instance registered with `on` can later be passed to `remove_listener`
//!
//! The bridge runs on a single-threaded event loop, so handles are `Rc` based and
//! request futures are not required to be `Send`.

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Requests account access, prompting the user when not yet authorized.
pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
/// Lists already-authorized accounts without prompting.
pub const ETH_ACCOUNTS: &str = "eth_accounts";
/// Returns the provider's active chain id as a hex string.
pub const ETH_CHAIN_ID: &str = "eth_chainId";
/// Asks the wallet to switch its active chain (EIP-3326).
pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
/// Signs and broadcasts a transaction, returning its hash.
pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";

/// Arguments of a single EIP-1193 `request` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestArguments {
    /// JSON-RPC method name.
    pub method: String,
    /// Positional parameters, omitted entirely when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl RequestArguments {
    /// Creates arguments for a parameterless call.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    /// Sets the positional parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = Some(params);
        self
    }
}

/// Error reported by a provider, following the EIP-1193 `ProviderRpcError` shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("provider error {code}: {}", describe(.message.as_deref()))]
pub struct ProviderRpcError {
    /// Numeric error code (EIP-1193 or JSON-RPC 2.0).
    pub code: i64,
    /// Message supplied by the wallet, if any.
    pub message: Option<String>,
    /// Additional wallet-specific data.
    pub data: Option<Value>,
}

fn describe(message: Option<&str>) -> &str {
    message.unwrap_or("<no message>")
}

impl ProviderRpcError {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested method or account has not been authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The chain passed to `wallet_switchEthereumChain` has not been added to the wallet.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// A request of the same kind is already awaiting user action.
    pub const REQUEST_PENDING: i64 = -32002;
    /// Internal JSON-RPC error; also used when a wallet rejects without a code.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Creates an error with a code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            data: None,
        }
    }

    /// Creates an error that carries only a code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        Self {
            code,
            message: None,
            data: None,
        }
    }

    /// Attaches wallet-specific data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the message when present and not blank.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }

    /// Returns `true` when the user declined the request in the wallet.
    #[must_use]
    pub const fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// Returns `true` when an identical request is still waiting in the wallet.
    #[must_use]
    pub const fn is_request_pending(&self) -> bool {
        self.code == Self::REQUEST_PENDING
    }

    /// Returns `true` when the wallet does not know the requested chain.
    #[must_use]
    pub const fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}

/// Provider notifications consumed by the wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    /// `accountsChanged`, payload is an ordered array of address strings.
    AccountsChanged,
    /// `chainChanged`, payload is the new chain id as a hex string.
    ChainChanged,
}

impl ProviderEvent {
    /// Returns the EIP-1193 event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
        }
    }
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider event listener.
///
/// Clones share the same underlying closure, and equality is pointer identity of
/// that closure. Two handlers built from identical code are therefore different
/// listeners, while a clone of a registered handler removes the registration.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Value)>);

impl EventHandler {
    /// Wraps a closure as a listener.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invokes the listener with an event payload.
    pub fn call(&self, payload: &Value) {
        (self.0)(payload);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventHandler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// The EIP-1193 provider interface.
///
/// Implementations must tolerate a listener calling `remove_listener` on itself
/// while it is being dispatched.
#[async_trait(?Send)]
pub trait Eip1193Provider {
    /// Issues a JSON-RPC request through the wallet.
    ///
    /// # Errors
    ///
    /// Returns the wallet's [`ProviderRpcError`] when the request is rejected or fails.
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError>;

    /// Registers a listener for a provider event.
    fn on(&self, event: ProviderEvent, handler: EventHandler);

    /// Removes a listener previously registered with [`Eip1193Provider::on`].
    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler);
}

#[async_trait(?Send)]
impl<T: Eip1193Provider + ?Sized> Eip1193Provider for Rc<T> {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderRpcError> {
        (**self).request(args).await
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        (**self).on(event, handler);
    }

    fn remove_listener(&self, event: ProviderEvent, handler: &EventHandler) {
        (**self).remove_listener(event, handler);
    }
}

/// Shared handle to a wallet provider.
pub type ProviderHandle = Rc<dyn Eip1193Provider>;

/// Returns `true` when both handles point at the same provider object.
#[must_use]
pub fn same_provider(a: &ProviderHandle, b: &ProviderHandle) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_request_arguments_omit_missing_params() {
        let args = RequestArguments::new(ETH_CHAIN_ID);
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json, serde_json::json!({ "method": "eth_chainId" }));
    }

    #[test]
    fn test_request_arguments_with_params() {
        let args = RequestArguments::new(WALLET_SWITCH_ETHEREUM_CHAIN)
            .with_params(vec![serde_json::json!({ "chainId": "0x1" })]);
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["params"][0]["chainId"], "0x1");
    }

    #[test]
    fn test_event_handler_identity() {
        let counter = Rc::new(Cell::new(0));
        let c = Rc::clone(&counter);
        let handler = EventHandler::new(move |_| c.set(c.get() + 1));
        let clone = handler.clone();
        let other = EventHandler::new(|_| {});

        assert_eq!(handler, clone);
        assert_ne!(handler, other);

        clone.call(&Value::Null);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_provider_error_classification() {
        assert!(ProviderRpcError::from_code(4001).is_user_rejected());
        assert!(ProviderRpcError::from_code(-32002).is_request_pending());
        assert!(ProviderRpcError::from_code(4902).is_unrecognized_chain());
        assert!(!ProviderRpcError::new(4100, "unauthorized").is_user_rejected());
    }

    #[test]
    fn test_provider_error_blank_message() {
        let err = ProviderRpcError::new(-32603, "   ");
        assert_eq!(err.message(), None);
        assert_eq!(err.to_string(), "provider error -32603:    ");
        assert_eq!(
            ProviderRpcError::from_code(1).to_string(),
            "provider error 1: <no message>"
        );
    }
}
