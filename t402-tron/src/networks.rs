//! Known TRON networks and their TRC-20 tokens.

use t402::networks::{NetworkInfo, normalize_network};

use crate::address::{addresses_equal, is_valid_address};

/// TRON mainnet (CAIP-2).
pub const TRON_MAINNET: &str = "tron:mainnet";

/// Nile testnet (CAIP-2).
pub const TRON_NILE: &str = "tron:nile";

/// Shasta testnet (CAIP-2).
pub const TRON_SHASTA: &str = "tron:shasta";

/// USDT on mainnet.
pub const USDT_MAINNET: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// USDT on Nile.
pub const USDT_NILE: &str = "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf";

/// USDT on Shasta.
pub const USDT_SHASTA: &str = "TG3XXyExBkPp9nzdajDZsozEu4BkaSJozs";

/// Decimals of USDT on TRON, also assumed for unknown tokens.
pub const DEFAULT_DECIMALS: u8 = 6;

/// Every supported CAIP-2 network.
pub const CAIP2_NETWORKS: &[&str] = &[TRON_MAINNET, TRON_NILE, TRON_SHASTA];

/// Legacy V1 network names.
pub const TRON_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "mainnet",
        namespace: "tron",
        reference: "mainnet",
    },
    NetworkInfo {
        name: "tron",
        namespace: "tron",
        reference: "mainnet",
    },
    NetworkInfo {
        name: "tron-mainnet",
        namespace: "tron",
        reference: "mainnet",
    },
    NetworkInfo {
        name: "nile",
        namespace: "tron",
        reference: "nile",
    },
    NetworkInfo {
        name: "tron-nile",
        namespace: "tron",
        reference: "nile",
    },
    NetworkInfo {
        name: "shasta",
        namespace: "tron",
        reference: "shasta",
    },
    NetworkInfo {
        name: "tron-shasta",
        namespace: "tron",
        reference: "shasta",
    },
];

/// A TRC-20 token the server scheme can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trc20Info {
    /// CAIP-2 network.
    pub network: &'static str,
    /// Contract address.
    pub contract: &'static str,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Token decimals.
    pub decimals: u8,
    /// Full-node HTTP API of the network.
    pub endpoint: &'static str,
}

/// Known tokens; one default per network.
pub const KNOWN_TOKENS: &[Trc20Info] = &[
    Trc20Info {
        network: TRON_MAINNET,
        contract: USDT_MAINNET,
        symbol: "USDT",
        name: "Tether USD",
        decimals: DEFAULT_DECIMALS,
        endpoint: "https://api.trongrid.io",
    },
    Trc20Info {
        network: TRON_NILE,
        contract: USDT_NILE,
        symbol: "USDT",
        name: "Tether USD (Nile)",
        decimals: DEFAULT_DECIMALS,
        endpoint: "https://api.nileex.io",
    },
    Trc20Info {
        network: TRON_SHASTA,
        contract: USDT_SHASTA,
        symbol: "USDT",
        name: "Tether USD (Shasta)",
        decimals: DEFAULT_DECIMALS,
        endpoint: "https://api.shasta.trongrid.io",
    },
];

/// Resolves a CAIP-2 identifier or legacy name to a supported CAIP-2
/// network.
#[must_use]
pub fn normalize(network: &str) -> Option<String> {
    let caip2 = normalize_network(TRON_NETWORKS, &network.to_ascii_lowercase())?.into_owned();
    KNOWN_TOKENS
        .iter()
        .any(|t| t.network == caip2)
        .then_some(caip2)
}

/// Returns the default token (USDT) of a network.
#[must_use]
pub fn default_token(network: &str) -> Option<&'static Trc20Info> {
    let caip2 = normalize(network)?;
    KNOWN_TOKENS.iter().find(|t| t.network == caip2)
}

/// Looks a token up by contract address or symbol.
///
/// Unknown contracts yield `None`; unknown symbols fall back to the
/// network default.
#[must_use]
pub fn find_token(network: &str, symbol_or_contract: &str) -> Option<&'static Trc20Info> {
    let default = default_token(network)?;
    if is_valid_address(symbol_or_contract) {
        return addresses_equal(default.contract, symbol_or_contract).then_some(default);
    }
    Some(default)
}

/// Returns `true` for Nile and Shasta.
#[must_use]
pub fn is_testnet(network: &str) -> bool {
    matches!(normalize(network).as_deref(), Some(TRON_NILE | TRON_SHASTA))
}
