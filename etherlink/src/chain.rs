//! EIP-155 chain identifiers and wallet chain switching.
//!
//! - [`Eip155ChainId`] - Numeric chain id, written on the wire as `0x`-prefixed hex
//! - [`ensure_chain`] - Moves a wallet onto a target chain when it is elsewhere
//!
//! Wallets are free to report chain ids in mixed case (`0xAA36A7`), so ids are
//! always compared as numbers, never as strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::ChainSwitchError;
use crate::provider::{
    ETH_CHAIN_ID, Eip1193Provider, RequestArguments, WALLET_SWITCH_ETHEREUM_CHAIN,
};

/// A numeric EIP-155 chain id (e.g. `1` for Ethereum, `0xaa36a7` for Sepolia).
///
/// # Serialization
///
/// Serializes to lowercase `0x` hex (`"0x89"`). Deserializes from a hex string,
/// a decimal string, or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eip155ChainId(u64);

impl Eip155ChainId {
    /// Creates a chain id from its numeric value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the `0x`-prefixed lowercase hex form used by EIP-1193 wallets.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Display for Eip155ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Eip155ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when a string is not a valid chain id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for Eip155ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed.map(Self).map_err(|_| ChainIdFormatError(s.into()))
    }
}

impl Serialize for Eip155ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Eip155ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Self(n)),
            Repr::Text(s) => Self::from_str(&s).map_err(de::Error::custom),
        }
    }
}

/// What [`ensure_chain`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The wallet was already on the target chain; nothing was requested.
    AlreadyActive,
    /// The wallet accepted a switch request.
    Switched,
}

/// Reads the wallet's active chain.
///
/// # Errors
///
/// Returns [`ChainSwitchError::ChainQuery`] when the request fails and
/// [`ChainSwitchError::MalformedChainId`] when the answer is not a chain id.
pub async fn current_chain_id(
    provider: &dyn Eip1193Provider,
) -> Result<Eip155ChainId, ChainSwitchError> {
    let value = provider
        .request(RequestArguments::new(ETH_CHAIN_ID))
        .await
        .map_err(ChainSwitchError::ChainQuery)?;
    serde_json::from_value::<Eip155ChainId>(value.clone())
        .map_err(|_| ChainSwitchError::MalformedChainId(value.to_string()))
}

/// Makes sure the wallet is on `target`, asking it to switch when it is not.
///
/// Calling this while the wallet is already on `target` issues no switch request.
/// An unrecognized chain is reported as [`ChainSwitchError::NotRecognized`]; the
/// chain is never added automatically.
///
/// # Errors
///
/// Returns [`ChainSwitchError`] when the active chain cannot be read or the
/// switch is refused.
pub async fn ensure_chain(
    provider: &dyn Eip1193Provider,
    target: Eip155ChainId,
) -> Result<SwitchOutcome, ChainSwitchError> {
    let current = current_chain_id(provider).await?;
    if current == target {
        #[cfg(feature = "telemetry")]
        tracing::debug!(chain = %target, "Wallet already on target chain");
        return Ok(SwitchOutcome::AlreadyActive);
    }

    #[cfg(feature = "telemetry")]
    tracing::info!(from = %current, to = %target, "Requesting chain switch");

    let params = vec![serde_json::json!({ "chainId": target.to_hex() })];
    match provider
        .request(RequestArguments::new(WALLET_SWITCH_ETHEREUM_CHAIN).with_params(params))
        .await
    {
        Ok(_) => Ok(SwitchOutcome::Switched),
        Err(e) if e.is_unrecognized_chain() => {
            #[cfg(feature = "telemetry")]
            tracing::warn!(chain = %target, "Wallet does not know the target chain");
            Err(ChainSwitchError::NotRecognized { chain_id: target })
        }
        Err(e) => Err(ChainSwitchError::Switch(e)),
    }
}
