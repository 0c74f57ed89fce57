//! The bridge form: source and destination network, token and amount.

use std::fmt;
use std::str::FromStr;

use crate::error::AmountError;
use crate::estimate::RouteQuery;
use crate::networks::{ETHEREUM, NetworkInfo, SEPOLIA, TOKENS, TokenInfo};

/// A strictly positive decimal amount, kept as its digits.
///
/// There is no upper bound and no precision limit here; both only apply when
/// the amount is scaled to base units.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount {
    whole: String,
    fraction: String,
}

impl Amount {
    /// Integer digits without leading zeros; empty for amounts below one.
    #[must_use]
    pub fn whole(&self) -> &str {
        &self.whole
    }

    /// Fractional digits without trailing zeros.
    #[must_use]
    pub fn fraction(&self) -> &str {
        &self.fraction
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = if self.whole.is_empty() { "0" } else { &self.whole };
        if self.fraction.is_empty() {
            f.write_str(whole)
        } else {
            write!(f, "{whole}.{}", self.fraction)
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

/// Parses a user-entered amount as a strictly positive decimal.
///
/// Accepts `digits`, `digits.digits`, `.digits` and `digits.` with
/// surrounding whitespace. Exponent notation, hex, a leading `+` and trailing
/// garbage are rejected.
///
/// # Errors
///
/// Returns [`AmountError`] when the input is empty, not a decimal number, or
/// not greater than zero.
pub fn parse_amount(input: &str) -> Result<Amount, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let malformed = |reason: &str| AmountError::Malformed {
        input: input.to_owned(),
        reason: reason.to_owned(),
    };

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed("no digits"));
    }
    if let Some(c) = whole
        .chars()
        .chain(fraction.chars())
        .find(|c| !c.is_ascii_digit())
    {
        return Err(malformed(&format!("unexpected character {c:?}")));
    }

    let whole = whole.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    if negative || (whole.is_empty() && fraction.is_empty()) {
        return Err(AmountError::NotPositive);
    }
    Ok(Amount {
        whole: whole.to_owned(),
        fraction: fraction.to_owned(),
    })
}

/// What the user is about to bridge.
///
/// The amount is kept as typed so it can be shown back and recorded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeIntent {
    from: &'static NetworkInfo,
    to: &'static NetworkInfo,
    token: &'static TokenInfo,
    amount: String,
}

impl Default for BridgeIntent {
    fn default() -> Self {
        Self::new(&SEPOLIA, &ETHEREUM)
    }
}

impl BridgeIntent {
    /// Creates an empty intent between two networks, bridging the first token.
    #[must_use]
    pub fn new(from: &'static NetworkInfo, to: &'static NetworkInfo) -> Self {
        Self {
            from,
            to,
            token: &TOKENS[0],
            amount: String::new(),
        }
    }

    /// Source network.
    #[must_use]
    pub const fn from_network(&self) -> &'static NetworkInfo {
        self.from
    }

    /// Destination network.
    #[must_use]
    pub const fn to_network(&self) -> &'static NetworkInfo {
        self.to
    }

    /// Selected token.
    #[must_use]
    pub const fn token(&self) -> &'static TokenInfo {
        self.token
    }

    /// The amount as typed.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Selects the source network.
    pub fn set_from_network(&mut self, network: &'static NetworkInfo) {
        self.from = network;
    }

    /// Selects the destination network.
    pub fn set_to_network(&mut self, network: &'static NetworkInfo) {
        self.to = network;
    }

    /// Selects the token.
    pub fn set_token(&mut self, token: &'static TokenInfo) {
        self.token = token;
    }

    /// Replaces the typed amount.
    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
    }

    /// Exchanges source and destination.
    pub fn swap_networks(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    /// Empties the amount field.
    pub fn clear_amount(&mut self) {
        self.amount.clear();
    }

    /// The amount as a positive decimal.
    ///
    /// # Errors
    ///
    /// See [`parse_amount`].
    pub fn parsed_amount(&self) -> Result<Amount, AmountError> {
        parse_amount(&self.amount)
    }

    /// Returns `true` when the amount is a positive number and an estimate
    /// should be requested.
    #[must_use]
    pub fn is_quotable(&self) -> bool {
        self.parsed_amount().is_ok()
    }

    /// Builds the estimator input, or `None` when the intent is not quotable.
    #[must_use]
    pub fn route_query(&self) -> Option<RouteQuery> {
        self.is_quotable().then(|| RouteQuery {
            amount: self.amount.trim().to_owned(),
            token_symbol: self.token.symbol.to_owned(),
            from_network: self.from.name.to_owned(),
            to_network: self.to.name.to_owned(),
        })
    }
}
