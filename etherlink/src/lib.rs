#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![allow(clippy::future_not_send)]

//! Wallet plumbing for the EtherLink bridge.
//!
//! This crate holds everything between the bridge UI and the user's wallet:
//! discovering wallets, keeping a connection, moving the wallet onto the right
//! chain, and sending the deposit transaction. It is host-agnostic; a browser
//! host supplies the provider objects, the discovery events, a timer and a
//! page reload.
//!
//! # Overview
//!
//! ```text
//! ProviderRegistry ──► WalletSession ──► BridgeController::bridge
//!                                            ├─► ensure_chain
//!                                            ├─► TransactionSubmitter::submit
//!                                            └─► TransactionLog::record
//! BridgeController::refresh_estimate ──► EstimateScheduler ──► RouteEstimator
//! ```
//!
//! Everything runs on one event loop. Shared state uses `Rc` and `RefCell`,
//! and futures are not `Send`.
//!
//! # Modules
//!
//! - [`provider`] - EIP-1193 provider capability and error codes
//! - [`discovery`] - EIP-6963 wallet discovery registry
//! - [`session`] - Connected wallet, account and event handlers
//! - [`chain`] - EIP-155 chain ids and chain switching
//! - [`transfer`] - Base-unit conversion and the deposit transaction
//! - [`estimate`] - Route estimates and the debounced scheduler
//! - [`bridge`] - The bridge form and submit action
//! - [`intent`] - Form contents and amount parsing
//! - [`history`] - Transaction log
//! - [`networks`] - Supported networks and tokens
//! - [`config`] - Bridge settings
//! - [`error`] - Error taxonomy with user-facing messages
//! - [`host`] - Page capabilities (reload, clock)
//!
//! # Feature Flags
//!
//! - `tokio` (default) - [`estimate::TokioTimer`] backed by `tokio::time`
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod bridge;
pub mod chain;
pub mod config;
pub mod discovery;
pub mod error;
pub mod estimate;
pub mod history;
pub mod host;
pub mod intent;
pub mod networks;
pub mod provider;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeController, BridgeSnapshot};
pub use chain::{Eip155ChainId, SwitchOutcome, ensure_chain};
pub use config::BridgeSettings;
pub use discovery::{DiscoveryChannel, ProviderDetail, ProviderInfo, ProviderRegistry};
pub use error::{AmountError, BridgeError, ChainSwitchError, SubmissionError, WalletError};
pub use estimate::{EstimationFailure, RiskScore, RouteEstimate, RouteEstimator, RouteQuery, Timer};
pub use host::Host;
pub use intent::{Amount, BridgeIntent};
pub use provider::{Eip1193Provider, ProviderHandle, ProviderRpcError};
pub use session::WalletSession;
pub use transfer::TransactionSubmitter;
