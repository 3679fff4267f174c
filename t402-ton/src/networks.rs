//! Known TON networks and their Jettons.

use t402::networks::{NetworkInfo, normalize_network};

use crate::address::addresses_equal;

/// TON mainnet (CAIP-2).
pub const TON_MAINNET: &str = "ton:mainnet";

/// TON testnet (CAIP-2).
pub const TON_TESTNET: &str = "ton:testnet";

/// USDT Jetton master on mainnet.
pub const USDT_MAINNET: &str = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs";

/// USDT Jetton master on testnet.
pub const USDT_TESTNET: &str = "kQBqSpvo4S87mX9tTc4FX3Sfqf4uSp3Tx-Fz4RBUfTRWBx";

/// Decimals of USDT on TON.
pub const DEFAULT_DECIMALS: u8 = 6;

/// Every supported CAIP-2 network.
pub const CAIP2_NETWORKS: &[&str] = &[TON_MAINNET, TON_TESTNET];

/// Decimals assumed for a Jetton nobody has told us about.
pub const UNKNOWN_JETTON_DECIMALS: u8 = 9;

/// Legacy V1 network names.
pub const TON_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "mainnet",
        namespace: "ton",
        reference: "mainnet",
    },
    NetworkInfo {
        name: "ton-mainnet",
        namespace: "ton",
        reference: "mainnet",
    },
    NetworkInfo {
        name: "testnet",
        namespace: "ton",
        reference: "testnet",
    },
    NetworkInfo {
        name: "ton-testnet",
        namespace: "ton",
        reference: "testnet",
    },
];

/// A Jetton the server scheme can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JettonInfo {
    /// CAIP-2 network.
    pub network: &'static str,
    /// Jetton master address.
    pub master: &'static str,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Jetton decimals.
    pub decimals: u8,
}

/// Known Jettons; the first entry per network is its default.
pub const KNOWN_JETTONS: &[JettonInfo] = &[
    JettonInfo {
        network: TON_MAINNET,
        master: USDT_MAINNET,
        symbol: "USDT",
        name: "Tether USD",
        decimals: DEFAULT_DECIMALS,
    },
    JettonInfo {
        network: TON_TESTNET,
        master: USDT_TESTNET,
        symbol: "USDT",
        name: "Tether USD (Testnet)",
        decimals: DEFAULT_DECIMALS,
    },
];

/// Resolves a CAIP-2 identifier or legacy name to CAIP-2 form.
///
/// Only `ton:mainnet` and `ton:testnet` are recognised.
#[must_use]
pub fn normalize(network: &str) -> Option<String> {
    let caip2 = normalize_network(TON_NETWORKS, network)?;
    matches!(caip2.as_ref(), TON_MAINNET | TON_TESTNET).then(|| caip2.into_owned())
}

/// Returns the default Jetton (USDT) of a network.
#[must_use]
pub fn default_jetton(network: &str) -> Option<&'static JettonInfo> {
    let caip2 = normalize(network)?;
    KNOWN_JETTONS.iter().find(|j| j.network == caip2)
}

/// Looks a Jetton up by symbol or master address.
///
/// Unknown symbols fall back to the network default. Unknown master
/// addresses yield `None`; the caller decides what decimals to assume.
#[must_use]
pub fn find_jetton(network: &str, symbol_or_master: &str) -> Option<&'static JettonInfo> {
    let caip2 = normalize(network)?;
    let mut on_network = KNOWN_JETTONS.iter().filter(|j| j.network == caip2);
    if crate::address::is_valid_address(symbol_or_master) {
        return on_network.find(|j| addresses_equal(j.master, symbol_or_master));
    }
    let symbol = symbol_or_master.to_ascii_uppercase();
    let mut fallback = None;
    for jetton in on_network {
        if jetton.symbol == symbol {
            return Some(jetton);
        }
        fallback.get_or_insert(jetton);
    }
    fallback
}

/// Public toncenter JSON-RPC endpoint of a network.
#[must_use]
pub fn endpoint(network: &str) -> Option<&'static str> {
    match normalize(network)?.as_str() {
        TON_MAINNET => Some("https://toncenter.com/api/v2/jsonRPC"),
        TON_TESTNET => Some("https://testnet.toncenter.com/api/v2/jsonRPC"),
        _ => None,
    }
}

/// Returns `true` for the TON testnet, under either name.
#[must_use]
pub fn is_testnet(network: &str) -> bool {
    normalize(network).as_deref() == Some(TON_TESTNET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_names() {
        assert_eq!(normalize("ton-mainnet").as_deref(), Some(TON_MAINNET));
        assert_eq!(normalize("mainnet").as_deref(), Some(TON_MAINNET));
        assert_eq!(normalize("ton:testnet").as_deref(), Some(TON_TESTNET));
        assert_eq!(normalize("ton:devnet"), None);
        assert_eq!(normalize("tron:mainnet"), None);
        assert!(is_testnet("ton-testnet"));
        assert!(!is_testnet("ton:mainnet"));
    }

    #[test]
    fn jetton_lookup() {
        assert_eq!(default_jetton("mainnet").unwrap().master, USDT_MAINNET);
        assert_eq!(find_jetton("ton:testnet", "usdt").unwrap().master, USDT_TESTNET);
        assert_eq!(find_jetton("ton:mainnet", "XYZ").unwrap().symbol, "USDT");
        assert_eq!(
            find_jetton("ton:mainnet", &USDT_MAINNET.to_lowercase()).unwrap().symbol,
            "USDT"
        );
        assert!(find_jetton("ton:mainnet", USDT_TESTNET).is_none());
    }
}
