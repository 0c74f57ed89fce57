//! The bridge form and its submit action.
//!
//! [`BridgeController`] owns everything on the bridge card: the user's
//! [`BridgeIntent`], the debounced [`RouteEstimate`], and the transaction log.
//! It borrows the wallet through a shared [`WalletSession`] handle and never
//! changes the session itself.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use alloy_primitives::Address;
use serde::Serialize;

use crate::chain::ensure_chain;
use crate::config::BridgeSettings;
use crate::error::BridgeError;
use crate::estimate::{EstimateOutcome, EstimateScheduler, RouteEstimate, RouteEstimator, Timer};
use crate::history::{TransactionLog, TransactionRecord, TxStatus};
use crate::host::Host;
use crate::intent::BridgeIntent;
use crate::networks::{NetworkInfo, TokenInfo};
use crate::provider::ProviderHandle;
use crate::session::{SessionSnapshot, WalletSession};
use crate::transfer::TransactionSubmitter;

/// Message recorded when no estimate commentary is available.
pub const DEFAULT_AI_MESSAGE: &str = "Bridge transfer initiated successfully.";

/// Serializable view of the whole bridge UI state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSnapshot {
    /// Wallet state
    pub session: SessionSnapshot,
    /// Source network id
    pub from_network: &'static str,
    /// Destination network id
    pub to_network: &'static str,
    /// Token symbol
    pub token: &'static str,
    /// Amount as typed
    pub amount: String,
    /// Current estimate
    pub estimate: Option<RouteEstimate>,
    /// An estimate is being computed
    pub analyzing: bool,
    /// A transfer is being submitted
    pub bridging: bool,
    /// Submitted transfers, newest first
    pub transactions: Vec<TransactionRecord>,
}

/// Clears the bridging flag when the action ends, however it ends.
struct BridgingGuard<'a>(&'a Cell<bool>);

impl<'a> BridgingGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        (!flag.replace(true)).then_some(Self(flag))
    }
}

impl Drop for BridgingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Drives the bridge card.
pub struct BridgeController<E, T> {
    session: WalletSession,
    host: Rc<dyn Host>,
    submitter: TransactionSubmitter,
    intent: RefCell<BridgeIntent>,
    scheduler: EstimateScheduler<E, T>,
    log: RefCell<TransactionLog>,
    bridging: Cell<bool>,
}

impl<E, T> fmt::Debug for BridgeController<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeController")
            .field("session", &self.session)
            .field("intent", &self.intent.borrow())
            .field("scheduler", &self.scheduler)
            .field("bridging", &self.bridging.get())
            .finish_non_exhaustive()
    }
}

impl<E, T> BridgeController<E, T>
where
    E: RouteEstimator,
    T: Timer,
{
    /// Creates a controller with the form in its configured initial state.
    pub fn new(
        session: WalletSession,
        host: Rc<dyn Host>,
        settings: &BridgeSettings,
        estimator: E,
        timer: T,
    ) -> Self {
        Self {
            session,
            host,
            submitter: TransactionSubmitter::from_settings(settings),
            intent: RefCell::new(settings.default_intent()),
            scheduler: EstimateScheduler::new(estimator, timer, settings.debounce_window()),
            log: RefCell::new(TransactionLog::new()),
            bridging: Cell::new(false),
        }
    }

    /// The wallet session this controller sends through.
    pub const fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Current form contents.
    pub fn intent(&self) -> BridgeIntent {
        self.intent.borrow().clone()
    }

    /// Replaces the typed amount.
    pub fn set_amount(&self, amount: impl Into<String>) {
        self.intent.borrow_mut().set_amount(amount);
    }

    /// Selects the token.
    pub fn set_token(&self, token: &'static TokenInfo) {
        self.intent.borrow_mut().set_token(token);
    }

    /// Selects the source network.
    pub fn set_from_network(&self, network: &'static NetworkInfo) {
        self.intent.borrow_mut().set_from_network(network);
    }

    /// Selects the destination network.
    pub fn set_to_network(&self, network: &'static NetworkInfo) {
        self.intent.borrow_mut().set_to_network(network);
    }

    /// Exchanges source and destination and drops the current estimate.
    pub fn swap_networks(&self) {
        self.intent.borrow_mut().swap_networks();
        self.scheduler.invalidate();
    }

    /// Schedules a debounced estimate of the form as it is now.
    ///
    /// Call after every input change. Resolves once this request is settled:
    /// superseded, cleared, discarded or applied.
    pub async fn refresh_estimate(&self) -> EstimateOutcome {
        let intent = self.intent();
        self.scheduler.schedule(&intent).await
    }

    /// Current estimate.
    pub fn estimate(&self) -> Option<RouteEstimate> {
        self.scheduler.current()
    }

    /// Returns `true` while an estimate is being computed.
    pub fn is_analyzing(&self) -> bool {
        self.scheduler.is_analyzing()
    }

    /// Returns `true` while a bridge action is running.
    pub fn is_bridging(&self) -> bool {
        self.bridging.get()
    }

    /// Submitted transfers, newest first.
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.log.borrow().entries().cloned().collect()
    }

    /// Full UI state.
    pub fn snapshot(&self) -> BridgeSnapshot {
        let intent = self.intent.borrow();
        BridgeSnapshot {
            session: self.session.snapshot(),
            from_network: intent.from_network().id,
            to_network: intent.to_network().id,
            token: intent.token().symbol,
            amount: intent.amount().to_owned(),
            estimate: self.estimate(),
            analyzing: self.is_analyzing(),
            bridging: self.is_bridging(),
            transactions: self.transactions(),
        }
    }

    /// Moves the wallet onto the source network and sends the transfer.
    ///
    /// On success the transfer is prepended to the log and the amount and
    /// estimate are cleared. On failure nothing is recorded and the session
    /// stays connected.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Busy`] while another bridge action runs
    /// - [`BridgeError::NotConnected`] without a wallet; the host should open the wallet picker
    /// - [`BridgeError::InvalidAmount`], [`BridgeError::ChainSwitch`] or
    ///   [`BridgeError::Submission`] when the corresponding step fails
    pub async fn bridge(&self) -> Result<TransactionRecord, BridgeError> {
        let Some(_guard) = BridgingGuard::acquire(&self.bridging) else {
            return Err(BridgeError::Busy);
        };
        let (Some(provider), Some(from)) = (self.session.provider(), self.session.account())
        else {
            return Err(BridgeError::NotConnected);
        };

        let intent = self.intent();
        intent.parsed_amount()?;

        match self.send(&provider, from, &intent).await {
            Ok(record) => Ok(record),
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, "Bridge action failed");
                Err(err)
            }
        }
    }

    async fn send(
        &self,
        provider: &ProviderHandle,
        from: Address,
        intent: &BridgeIntent,
    ) -> Result<TransactionRecord, BridgeError> {
        ensure_chain(&**provider, intent.from_network().chain_id).await?;
        let hash = self
            .submitter
            .submit(&**provider, from, intent.amount())
            .await?;

        let ai_message = self
            .scheduler
            .current()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_AI_MESSAGE.to_owned());

        let mut log = self.log.borrow_mut();
        let record = TransactionRecord {
            id: log.allocate_id(),
            timestamp: self.host.now_millis(),
            from_network: intent.from_network().name.to_owned(),
            to_network: intent.to_network().name.to_owned(),
            token: intent.token().symbol.to_owned(),
            amount: intent.amount().trim().to_owned(),
            status: TxStatus::Completed,
            hash,
            ai_message: Some(ai_message),
        };
        log.record(record.clone());
        drop(log);

        self.intent.borrow_mut().clear_amount();
        self.scheduler.invalidate();
        Ok(record)
    }
}
