//! EIP-6963 multi-wallet discovery.
//!
//! Wallets announce themselves with an `eip6963:announceProvider` event, and
//! re-announce whenever a page dispatches `eip6963:requestProvider`. The
//! [`ProviderRegistry`] collects announcements for the lifetime of the page,
//! keeping the first announcement seen for each `uuid`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::provider::ProviderHandle;

/// Event a wallet dispatches to announce itself.
pub const ANNOUNCE_PROVIDER_EVENT: &str = "eip6963:announceProvider";
/// Event a page dispatches to ask wallets to announce.
pub const REQUEST_PROVIDER_EVENT: &str = "eip6963:requestProvider";

/// Wallet metadata from an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Per-session unique id (UUIDv4)
    pub uuid: String,
    /// Human-readable wallet name
    pub name: String,
    /// Icon as a data URI
    pub icon: String,
    /// Reverse-DNS wallet identifier (e.g. `io.metamask`)
    pub rdns: String,
}

/// An announced wallet: its metadata and provider.
#[derive(Clone)]
pub struct ProviderDetail {
    /// Metadata
    pub info: ProviderInfo,
    /// EIP-1193 provider
    pub provider: ProviderHandle,
}

impl fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Callback invoked for each announcement.
#[derive(Clone)]
pub struct AnnounceListener(Rc<dyn Fn(ProviderDetail)>);

impl AnnounceListener {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ProviderDetail) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Delivers one announcement.
    pub fn call(&self, detail: ProviderDetail) {
        (self.0)(detail);
    }
}

impl fmt::Debug for AnnounceListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnnounceListener")
    }
}

/// Handle returned by [`DiscoveryChannel::add_announce_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates an id. Channels pick their own numbering.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Transport for the announce/request handshake.
pub trait DiscoveryChannel {
    /// Subscribes to announcements.
    fn add_announce_listener(&self, listener: AnnounceListener) -> ListenerId;

    /// Unsubscribes a listener. Unknown ids are ignored.
    fn remove_announce_listener(&self, id: ListenerId);

    /// Asks every wallet to announce itself. Announcements may be delivered
    /// before this returns.
    fn request_providers(&self);
}

struct RegistryInner {
    channel: Rc<dyn DiscoveryChannel>,
    providers: RefCell<Vec<ProviderDetail>>,
    listener: Cell<Option<ListenerId>>,
}

impl RegistryInner {
    fn announce(&self, detail: ProviderDetail) {
        let mut providers = self.providers.borrow_mut();
        if providers.iter().any(|p| p.info.uuid == detail.info.uuid) {
            #[cfg(feature = "telemetry")]
            tracing::debug!(uuid = %detail.info.uuid, name = %detail.info.name, "Ignoring duplicate provider announcement");
            return;
        }
        #[cfg(feature = "telemetry")]
        tracing::info!(uuid = %detail.info.uuid, name = %detail.info.name, rdns = %detail.info.rdns, "Wallet provider announced");
        providers.push(detail);
    }
}

/// The set of wallets discovered on this page, in discovery order.
///
/// The registry subscribes once on [`start`](Self::start) and unsubscribes
/// exactly once, on [`dispose`](Self::dispose) or drop, whichever comes first.
pub struct ProviderRegistry {
    inner: Rc<RegistryInner>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.inner.providers.borrow())
            .field("listening", &self.is_listening())
            .finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    /// Subscribes to announcements, then broadcasts a provider request.
    pub fn start(channel: Rc<dyn DiscoveryChannel>) -> Self {
        let inner = Rc::new(RegistryInner {
            channel: Rc::clone(&channel),
            providers: RefCell::new(Vec::new()),
            listener: Cell::new(None),
        });

        let weak: Weak<RegistryInner> = Rc::downgrade(&inner);
        let id = channel.add_announce_listener(AnnounceListener::new(move |detail| {
            if let Some(inner) = weak.upgrade() {
                inner.announce(detail);
            }
        }));
        inner.listener.set(Some(id));
        channel.request_providers();

        Self { inner }
    }

    /// Known providers, in discovery order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderDetail> {
        self.inner.providers.borrow().clone()
    }

    /// Metadata of the known providers, in discovery order.
    #[must_use]
    pub fn infos(&self) -> Vec<ProviderInfo> {
        self.inner
            .providers
            .borrow()
            .iter()
            .map(|p| p.info.clone())
            .collect()
    }

    /// Finds a provider by its announcement `uuid`.
    #[must_use]
    pub fn find(&self, uuid: &str) -> Option<ProviderDetail> {
        self.inner
            .providers
            .borrow()
            .iter()
            .find(|p| p.info.uuid == uuid)
            .cloned()
    }

    /// Number of known providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.providers.borrow().len()
    }

    /// Returns `true` when no wallet has announced itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.providers.borrow().is_empty()
    }

    /// Broadcasts another provider request. Does nothing once disposed.
    pub fn refresh(&self) {
        if self.is_listening() {
            self.inner.channel.request_providers();
        }
    }

    /// Returns `true` until the registry is disposed.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    /// Unsubscribes from announcements. Further calls do nothing.
    pub fn dispose(&self) {
        if let Some(id) = self.inner.listener.take() {
            self.inner.channel.remove_announce_listener(id);
        }
    }
}

impl Drop for ProviderRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualDiscovery, MockProvider, wallet};

    #[test]
    fn test_duplicate_uuid_keeps_first() {
        let channel = ManualDiscovery::new();
        channel.register(wallet("a", "MetaMask"));
        channel.register(wallet("a", "Impostor"));

        let registry = ProviderRegistry::start(channel.as_channel());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.providers()[0].info.name, "MetaMask");
        assert_eq!(channel.request_count(), 1);
    }

    #[test]
    fn test_discovery_order_and_late_announcements() {
        let channel = ManualDiscovery::new();
        channel.register(wallet("b", "Rabby"));
        let registry = ProviderRegistry::start(channel.as_channel());

        channel.announce(wallet("c", "Coinbase Wallet"));
        channel.announce(wallet("b", "Rabby again"));

        let names: Vec<_> = registry.infos().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["Rabby", "Coinbase Wallet"]);
        assert!(registry.find("c").is_some());
        assert!(registry.find("z").is_none());
    }

    #[test]
    fn test_refresh_does_not_duplicate() {
        let channel = ManualDiscovery::new();
        channel.register(wallet("a", "MetaMask"));
        let registry = ProviderRegistry::start(channel.as_channel());

        registry.refresh();
        registry.refresh();

        assert_eq!(registry.len(), 1);
        assert_eq!(channel.request_count(), 3);
    }

    #[test]
    fn test_dispose_unsubscribes_once() {
        let channel = ManualDiscovery::new();
        let registry = ProviderRegistry::start(channel.as_channel());
        assert_eq!(channel.listener_count(), 1);

        registry.dispose();
        registry.dispose();
        channel.announce(wallet("a", "MetaMask"));
        registry.refresh();

        assert!(registry.is_empty());
        assert!(!registry.is_listening());
        assert_eq!(channel.listener_count(), 0);
        assert_eq!(channel.removal_count(), 1);
        assert_eq!(channel.request_count(), 1);

        drop(registry);
        assert_eq!(channel.removal_count(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let channel = ManualDiscovery::new();
        {
            let _registry = ProviderRegistry::start(channel.as_channel());
        }
        assert_eq!(channel.listener_count(), 0);
        assert_eq!(channel.removal_count(), 1);
    }

    #[test]
    fn test_detail_keeps_provider_identity() {
        let provider = MockProvider::new();
        let handle = provider.handle();
        let channel = ManualDiscovery::new();
        channel.register(ProviderDetail {
            info: wallet("a", "MetaMask").info,
            provider: Rc::clone(&handle),
        });

        let registry = ProviderRegistry::start(channel.as_channel());
        let found = registry.find("a").unwrap();
        assert!(crate::provider::same_provider(&found.provider, &handle));
    }
}
