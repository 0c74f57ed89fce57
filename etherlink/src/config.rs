//! Bridge settings.
//!
//! All fields are optional in the JSON document; missing ones take the
//! defaults below.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "debounce_ms": 500,
//!   "default_from": "goerli",
//!   "default_to": "polygon"
//! }
//! ```

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::DEFAULT_MESSAGE_LIMIT;
use crate::intent::BridgeIntent;
use crate::networks::network_by_id;
use crate::transfer::{BRIDGE_ADDRESS, TRANSFER_GAS_LIMIT};

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The document is not valid settings JSON.
    #[error("Invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A default network id does not name a known network.
    #[error("Unknown network id {0:?}")]
    UnknownNetwork(String),
}

/// Tunables of the bridge controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Quiet period before an estimate is requested, in milliseconds (default: `800`).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Deposit address every transfer is sent to (default: the `0x…dEaD` burn address).
    #[serde(default = "default_bridge_address")]
    pub bridge_address: Address,

    /// Gas limit of the transfer (default: `21000`).
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Initially selected source network id (default: `sepolia`).
    #[serde(default = "default_from")]
    pub default_from: String,

    /// Initially selected destination network id (default: `ethereum`).
    #[serde(default = "default_to")]
    pub default_to: String,

    /// Longest wallet error message shown verbatim (default: `60`).
    #[serde(default = "default_error_message_limit")]
    pub error_message_limit: usize,
}

const fn default_debounce_ms() -> u64 {
    800
}

const fn default_bridge_address() -> Address {
    BRIDGE_ADDRESS
}

const fn default_gas_limit() -> u64 {
    TRANSFER_GAS_LIMIT
}

fn default_from() -> String {
    "sepolia".into()
}

fn default_to() -> String {
    "ethereum".into()
}

const fn default_error_message_limit() -> usize {
    DEFAULT_MESSAGE_LIMIT
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            bridge_address: default_bridge_address(),
            gas_limit: default_gas_limit(),
            default_from: default_from(),
            default_to: default_to(),
            error_message_limit: default_error_message_limit(),
        }
    }
}

impl BridgeSettings {
    /// Parses and validates a settings document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the JSON is malformed or names an
    /// unknown network.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the default networks exist.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownNetwork`] for the first unknown id.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for id in [&self.default_from, &self.default_to] {
            if network_by_id(id).is_none() {
                return Err(SettingsError::UnknownNetwork(id.clone()));
            }
        }
        Ok(())
    }

    /// The debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The intent the form starts with. Unknown ids fall back to the
    /// built-in defaults.
    #[must_use]
    pub fn default_intent(&self) -> BridgeIntent {
        let fallback = BridgeIntent::default();
        let from = network_by_id(&self.default_from).unwrap_or(fallback.from_network());
        let to = network_by_id(&self.default_to).unwrap_or(fallback.to_network());
        BridgeIntent::new(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BridgeSettings::from_json("{}").unwrap();
        assert_eq!(settings, BridgeSettings::default());
        assert_eq!(settings.debounce_window(), Duration::from_millis(800));
        assert_eq!(settings.bridge_address, BRIDGE_ADDRESS);
        assert_eq!(settings.gas_limit, 21_000);
        assert_eq!(settings.error_message_limit, 60);

        let intent = settings.default_intent();
        assert_eq!(intent.from_network().id, "sepolia");
        assert_eq!(intent.to_network().id, "ethereum");
    }

    #[test]
    fn test_overrides() {
        let settings = BridgeSettings::from_json(
            r#"{ "debounce_ms": 250, "default_from": "goerli", "default_to": "polygon" }"#,
        )
        .unwrap();
        assert_eq!(settings.debounce_ms, 250);
        let intent = settings.default_intent();
        assert_eq!(intent.from_network().id, "goerli");
        assert_eq!(intent.to_network().id, "polygon");
    }

    #[test]
    fn test_unknown_network_rejected() {
        let err = BridgeSettings::from_json(r#"{ "default_to": "arbitrum" }"#).unwrap_err();
        assert!(matches!(err, SettingsError::UnknownNetwork(id) if id == "arbitrum"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            BridgeSettings::from_json("{ debounce_ms: }"),
            Err(SettingsError::Parse(_))
        ));
    }
}
