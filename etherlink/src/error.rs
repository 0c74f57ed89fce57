//! Error types for wallet connection, chain switching and transfer submission.
//!
//! The `Display` text of each user-facing variant is the message shown to the
//! user, so hosts can surface errors with `to_string()` directly.

use crate::chain::Eip155ChainId;
use crate::provider::ProviderRpcError;

/// Default maximum length of a provider message surfaced verbatim.
pub const DEFAULT_MESSAGE_LIMIT: usize = 60;

/// Errors raised while connecting a wallet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// Connect was attempted without any provider available.
    #[error("No wallet provider found. Please install a wallet.")]
    NoProvider,

    /// The user declined the account request.
    #[error("You rejected the connection request.")]
    UserRejected,

    /// An account request is already waiting in the wallet.
    #[error("Request pending. Please check your wallet extension.")]
    RequestPending,

    /// Any other connect failure.
    #[error("{message}")]
    Connection {
        /// Display message, already shortened for the UI.
        message: String,
        /// Provider error code, when the failure came from the provider.
        code: Option<i64>,
    },
}

impl WalletError {
    /// Generic text used when the provider gave nothing displayable.
    pub const GENERIC_MESSAGE: &'static str = "Failed to connect wallet.";
    /// Text used in place of provider messages longer than the display limit.
    pub const TRUNCATED_MESSAGE: &'static str = "Connection failed";

    /// Classifies a provider error raised by an account request.
    ///
    /// Messages longer than `limit` characters are replaced rather than cut,
    /// since wallet messages are rarely meaningful when partially shown.
    #[must_use]
    pub fn from_provider(err: &ProviderRpcError, limit: usize) -> Self {
        if err.is_user_rejected() {
            return Self::UserRejected;
        }
        if err.is_request_pending() {
            return Self::RequestPending;
        }
        let message = match err.message() {
            Some(m) if m.chars().count() > limit => Self::TRUNCATED_MESSAGE.to_owned(),
            Some(m) => m.to_owned(),
            None => Self::GENERIC_MESSAGE.to_owned(),
        };
        Self::Connection {
            message,
            code: Some(err.code),
        }
    }

    /// Creates a connection error that did not originate from a provider code.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            code: None,
        }
    }
}

/// Errors raised while making sure the wallet is on the source network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChainSwitchError {
    /// The wallet does not know the target chain. The user must add it manually.
    #[error("Please add this network to your wallet first.")]
    NotRecognized {
        /// The chain that was requested.
        chain_id: Eip155ChainId,
    },

    /// Reading the active chain failed.
    #[error("Failed to read the active chain: {0}")]
    ChainQuery(#[source] ProviderRpcError),

    /// The wallet reported a chain id that is not a valid EIP-155 id.
    #[error("Wallet reported an invalid chain id: {0}")]
    MalformedChainId(String),

    /// The switch request itself failed.
    #[error("Failed to switch network: {}", rejection_text(.0))]
    Switch(#[source] ProviderRpcError),
}

/// Errors raised while validating a transfer amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The amount field is empty.
    #[error("Enter an amount to bridge.")]
    Empty,

    /// The input is not a plain decimal number.
    #[error("Amount {input:?} is not a valid number: {reason}")]
    Malformed {
        /// The rejected input.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Zero or negative amounts cannot be bridged.
    #[error("Amount must be greater than zero.")]
    NotPositive,

    /// The amount is positive but smaller than one base unit.
    #[error("Amount is smaller than the smallest transferable unit.")]
    BelowSmallestUnit,

    /// The amount in base units does not fit in 256 bits.
    #[error("Amount is larger than any transferable value.")]
    TooLarge,
}

/// Errors raised by the send-transaction step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    /// The wallet rejected or failed the transaction.
    #[error("Transaction failed: {}", rejection_text(.0))]
    Provider(#[source] ProviderRpcError),

    /// The wallet answered with something other than a transaction hash.
    #[error("Transaction failed: wallet returned an invalid transaction hash")]
    InvalidHash(serde_json::Value),

    /// The amount could not be converted to base units.
    #[error("Transaction failed: {0}")]
    Amount(#[from] AmountError),
}

/// Errors raised by a bridge action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// No wallet is connected; the host should open the wallet picker.
    #[error("Connect a wallet to bridge assets.")]
    NotConnected,

    /// A bridge action is already running.
    #[error("A bridge transfer is already in progress.")]
    Busy,

    /// The entered amount is not bridgeable.
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    /// The wallet could not be moved to the source network.
    #[error(transparent)]
    ChainSwitch(#[from] ChainSwitchError),

    /// The transaction was not sent.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

fn rejection_text(err: &ProviderRpcError) -> &str {
    err.message().unwrap_or("User rejected")
}
