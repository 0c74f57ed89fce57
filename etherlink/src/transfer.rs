//! Native-asset transfer to the bridge deposit address.
//!
//! Amounts are converted to base units digit by digit in [`U256`]. Fractional
//! digits beyond the asset's precision are truncated toward zero.

use alloy_primitives::{Address, U256, address};
use serde::Serialize;

use crate::config::BridgeSettings;
use crate::error::{AmountError, SubmissionError};
use crate::intent::{Amount, parse_amount};
use crate::provider::{ETH_SEND_TRANSACTION, Eip1193Provider, RequestArguments};

/// Demo deposit address. Funds sent here are burned.
pub const BRIDGE_ADDRESS: Address = address!("000000000000000000000000000000000000dEaD");

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Decimals of every EVM native asset.
pub const NATIVE_DECIMALS: u32 = 18;

/// Transaction hash as returned by the wallet, unmodified.
pub type TxHash = String;

/// Converts a positive decimal amount into integer base units.
///
/// # Errors
///
/// Returns [`AmountError::BelowSmallestUnit`] when truncation leaves nothing
/// and [`AmountError::TooLarge`] when the result exceeds [`U256::MAX`].
pub fn to_base_units(amount: &Amount, decimals: u32) -> Result<U256, AmountError> {
    let precision = usize::try_from(decimals).unwrap_or(usize::MAX);
    let fraction = amount.fraction().as_bytes();
    let kept = &fraction[..fraction.len().min(precision)];
    let padding = precision - kept.len();

    let ten = U256::from(10u8);
    let mut units = U256::ZERO;
    for &digit in amount.whole().as_bytes().iter().chain(kept) {
        units = units
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or(AmountError::TooLarge)?;
    }
    if units.is_zero() {
        return Err(AmountError::BelowSmallestUnit);
    }
    for _ in 0..padding {
        units = units.checked_mul(ten).ok_or(AmountError::TooLarge)?;
    }
    Ok(units)
}

/// Formats an integer as an Ethereum JSON-RPC quantity (`0x`, no leading zeros).
#[must_use]
pub fn to_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

/// Parameters of an `eth_sendTransaction` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    /// Sending account
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Value in wei, hex quantity
    pub value: String,
    /// Gas limit, hex quantity
    pub gas: String,
}

/// Builds and sends the bridge deposit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSubmitter {
    to: Address,
    gas_limit: u64,
}

impl Default for TransactionSubmitter {
    fn default() -> Self {
        Self::new(BRIDGE_ADDRESS, TRANSFER_GAS_LIMIT)
    }
}

impl TransactionSubmitter {
    /// Creates a submitter sending to `to` with a fixed gas limit.
    #[must_use]
    pub const fn new(to: Address, gas_limit: u64) -> Self {
        Self { to, gas_limit }
    }

    /// Creates a submitter from loaded settings.
    #[must_use]
    pub const fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(settings.bridge_address, settings.gas_limit)
    }

    /// Destination of every transfer.
    #[must_use]
    pub const fn destination(&self) -> Address {
        self.to
    }

    /// Builds the transaction for `amount` (a decimal string in whole units).
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] when the amount is not a positive decimal.
    pub fn build(&self, from: Address, amount: &str) -> Result<TransactionParams, AmountError> {
        let value = to_base_units(&parse_amount(amount)?, NATIVE_DECIMALS)?;
        Ok(TransactionParams {
            from,
            to: self.to,
            value: to_quantity(value),
            gas: to_quantity(U256::from(self.gas_limit)),
        })
    }

    /// Sends the transfer through `provider` and returns the wallet's hash.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError`] when the amount is invalid, the wallet
    /// rejects the request, or the wallet answers with something other than a
    /// string.
    pub async fn submit(
        &self,
        provider: &dyn Eip1193Provider,
        from: Address,
        amount: &str,
    ) -> Result<TxHash, SubmissionError> {
        let tx = self.build(from, amount)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(from = %tx.from, to = %tx.to, value = %tx.value, "Sending bridge transaction");

        let result = provider
            .request(
                RequestArguments::new(ETH_SEND_TRANSACTION).with_params(vec![serde_json::json!(tx)]),
            )
            .await
            .map_err(SubmissionError::Provider)?;

        match result {
            serde_json::Value::String(hash) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(hash = %hash, "Bridge transaction submitted");
                Ok(hash)
            }
            other => Err(SubmissionError::InvalidHash(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;
    use crate::provider::ProviderRpcError;
    use crate::testing::MockProvider;

    fn units(s: &str) -> Result<U256, AmountError> {
        to_base_units(&parse_amount(s)?, NATIVE_DECIMALS)
    }

    #[test]
    fn test_one_and_a_half() {
        assert_eq!(to_quantity(units("1.5").unwrap()), "0x14d1120d7b160000");
    }

    #[test]
    fn test_exact_conversion() {
        assert_eq!(
            units("1").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(units("0.000000000000000001").unwrap(), U256::from(1u8));
        assert_eq!(
            units("123456789.123456789123456789").unwrap(),
            U256::from_str("123456789123456789123456789").unwrap()
        );
        assert_eq!(units("0.1").unwrap(), U256::from(100_000_000_000_000_000u128));
    }

    #[test]
    fn test_excess_decimals_truncate() {
        assert_eq!(units("1.0000000000000000019").unwrap(), U256::from(1_000_000_000_000_000_001u128));
        assert_eq!(units("0.0000000000000000009"), Err(AmountError::BelowSmallestUnit));
    }

    #[test]
    fn test_non_positive() {
        assert_eq!(units("0"), Err(AmountError::NotPositive));
        assert_eq!(units("-2"), Err(AmountError::NotPositive));
    }

    #[test]
    fn test_far_below_one_unit() {
        assert_eq!(
            units("0.00000000000000000000000000001"),
            Err(AmountError::BelowSmallestUnit)
        );
    }

    #[test]
    fn test_large_amounts() {
        assert_eq!(
            units("100000000000000000000000000000").unwrap(),
            U256::from(10u8).pow(U256::from(47u8))
        );
        assert_eq!(
            units("123456789012345678901234567890.5").unwrap(),
            U256::from_str("123456789012345678901234567890500000000000000000").unwrap()
        );

        // U256::MAX is about 1.16e77, so 1e59 tokens still fit and 2e59 do not.
        let fits = format!("1{}", "0".repeat(59));
        assert_eq!(
            units(&fits).unwrap(),
            U256::from(10u8).pow(U256::from(77u8))
        );
        let overflows = format!("2{}", "0".repeat(59));
        assert_eq!(units(&overflows), Err(AmountError::TooLarge));
    }

    #[test]
    fn test_build_large_amount() {
        let tx = TransactionSubmitter::default()
            .build(Address::ZERO, "100000000000000000000000000000")
            .unwrap();
        assert_eq!(tx.value, to_quantity(U256::from(10u8).pow(U256::from(47u8))));
    }

    #[test]
    fn test_build_params() {
        let from = address!("1111111111111111111111111111111111111111");
        let tx = TransactionSubmitter::default().build(from, "2").unwrap();
        assert_eq!(tx.to, BRIDGE_ADDRESS);
        assert_eq!(tx.value, "0x1bc16d674ec80000");
        assert_eq!(tx.gas, "0x5208");

        let json = serde_json::to_value(&tx).unwrap();
        let to: Address = serde_json::from_value(json["to"].clone()).unwrap();
        assert_eq!(to, BRIDGE_ADDRESS);
        assert_eq!(json["gas"], "0x5208");
    }

    #[tokio::test]
    async fn test_submit_returns_hash() {
        let provider = MockProvider::new();
        provider.respond(ETH_SEND_TRANSACTION, Ok(json!("0xabc123")));
        let from = address!("2222222222222222222222222222222222222222");

        let hash = TransactionSubmitter::default()
            .submit(&*provider, from, "1.5")
            .await
            .unwrap();

        assert_eq!(hash, "0xabc123");
        let call = &provider.calls()[0];
        let params = call.params.as_ref().unwrap();
        assert_eq!(params[0]["value"], "0x14d1120d7b160000");
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let provider = MockProvider::new();
        provider.respond(
            ETH_SEND_TRANSACTION,
            Err(ProviderRpcError::from_code(ProviderRpcError::USER_REJECTED)),
        );

        let err = TransactionSubmitter::default()
            .submit(&*provider, Address::ZERO, "1")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Transaction failed: User rejected");
    }

    #[tokio::test]
    async fn test_submit_invalid_amount_sends_nothing() {
        let provider = MockProvider::new();
        let err = TransactionSubmitter::default()
            .submit(&*provider, Address::ZERO, "abc")
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Amount(AmountError::Malformed { .. })));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_non_string_result() {
        let provider = MockProvider::new();
        provider.respond(ETH_SEND_TRANSACTION, Ok(json!({ "hash": "0x1" })));

        let err = TransactionSubmitter::default()
            .submit(&*provider, Address::ZERO, "1")
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::InvalidHash(_)));
    }
}
