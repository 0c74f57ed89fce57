//! Static reference data: supported networks, bridgeable tokens and the
//! display-only gas history series.
//!
//! Networks are looked up either by their short id (`"sepolia"`) or by the
//! EIP-155 chain id a wallet reports.

use serde::Serialize;

use crate::chain::Eip155ChainId;

/// Whether a network carries real value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Test network, assets have no value.
    Testnet,
    /// Production network.
    Mainnet,
}

/// A network the bridge can move assets from or to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    /// Short identifier (e.g. `"sepolia"`)
    pub id: &'static str,
    /// Display name (e.g. `"Sepolia Testnet"`)
    pub name: &'static str,
    /// Testnet or mainnet
    pub kind: NetworkKind,
    /// Native currency symbol (e.g. `"SEP"`)
    pub native_currency: &'static str,
    /// EIP-155 chain id
    pub chain_id: Eip155ChainId,
}

/// Sepolia testnet.
pub const SEPOLIA: NetworkInfo = NetworkInfo {
    id: "sepolia",
    name: "Sepolia Testnet",
    kind: NetworkKind::Testnet,
    native_currency: "SEP",
    chain_id: Eip155ChainId::new(0xaa36a7),
};

/// Goerli testnet.
pub const GOERLI: NetworkInfo = NetworkInfo {
    id: "goerli",
    name: "Goerli Testnet",
    kind: NetworkKind::Testnet,
    native_currency: "GOR",
    chain_id: Eip155ChainId::new(0x5),
};

/// Ethereum mainnet.
pub const ETHEREUM: NetworkInfo = NetworkInfo {
    id: "ethereum",
    name: "Ethereum Mainnet",
    kind: NetworkKind::Mainnet,
    native_currency: "ETH",
    chain_id: Eip155ChainId::new(0x1),
};

/// Polygon PoS mainnet.
pub const POLYGON: NetworkInfo = NetworkInfo {
    id: "polygon",
    name: "Polygon Mainnet",
    kind: NetworkKind::Mainnet,
    native_currency: "MATIC",
    chain_id: Eip155ChainId::new(0x89),
};

/// Every supported network, in display order.
pub static NETWORKS: &[NetworkInfo] = &[SEPOLIA, GOERLI, ETHEREUM, POLYGON];

/// A token offered in the bridge form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    /// Short identifier (e.g. `"usdc"`)
    pub id: &'static str,
    /// Ticker symbol (e.g. `"USDC"`)
    pub symbol: &'static str,
    /// Full name
    pub name: &'static str,
    /// Emoji shown next to the symbol
    pub icon: &'static str,
}

/// Every bridgeable token, in display order.
pub static TOKENS: &[TokenInfo] = &[
    TokenInfo {
        id: "eth",
        symbol: "ETH",
        name: "Ethereum",
        icon: "💎",
    },
    TokenInfo {
        id: "usdc",
        symbol: "USDC",
        name: "USD Coin",
        icon: "💵",
    },
    TokenInfo {
        id: "usdt",
        symbol: "USDT",
        name: "Tether",
        icon: "₮",
    },
    TokenInfo {
        id: "dai",
        symbol: "DAI",
        name: "Dai Stablecoin",
        icon: "🔸",
    },
];

/// Looks up a network by its short id.
#[must_use]
pub fn network_by_id(id: &str) -> Option<&'static NetworkInfo> {
    NETWORKS.iter().find(|n| n.id == id)
}

/// Looks up a network by EIP-155 chain id.
#[must_use]
pub fn network_by_chain_id(chain_id: Eip155ChainId) -> Option<&'static NetworkInfo> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Looks up a token by its short id.
#[must_use]
pub fn token_by_id(id: &str) -> Option<&'static TokenInfo> {
    TOKENS.iter().find(|t| t.id == id)
}

/// Looks up a token by ticker symbol, ignoring ASCII case.
#[must_use]
pub fn token_by_symbol(symbol: &str) -> Option<&'static TokenInfo> {
    TOKENS.iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

/// One point of the gas price chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasPricePoint {
    /// Hour label, `HH:MM`
    pub time: &'static str,
    /// Gas price in gwei
    pub price: u32,
}

/// Illustrative gas price series for the chart. Not live data.
pub static MOCK_GAS_HISTORY: &[GasPricePoint] = &[
    GasPricePoint { time: "10:00", price: 15 },
    GasPricePoint { time: "11:00", price: 18 },
    GasPricePoint { time: "12:00", price: 25 },
    GasPricePoint { time: "13:00", price: 22 },
    GasPricePoint { time: "14:00", price: 30 },
    GasPricePoint { time: "15:00", price: 28 },
    GasPricePoint { time: "16:00", price: 12 },
];
