//! Known Solana networks and their USDC mints.
//!
//! Solana networks are identified by the first 32 characters of their
//! genesis block hash.

use solana_pubkey::{Pubkey, pubkey};
use t402::networks::{NetworkInfo, normalize_network};

/// Solana mainnet (CAIP-2).
pub const SOLANA_MAINNET: &str = "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";

/// Solana devnet (CAIP-2).
pub const SOLANA_DEVNET: &str = "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1";

/// Solana testnet (CAIP-2).
pub const SOLANA_TESTNET: &str = "solana:4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z";

/// Default token decimals for USDC.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

/// Legacy V1 network names.
pub const SVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "solana",
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    },
    NetworkInfo {
        name: "solana-mainnet",
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    },
    NetworkInfo {
        name: "solana-devnet",
        namespace: "solana",
        reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    },
    NetworkInfo {
        name: "solana-testnet",
        namespace: "solana",
        reference: "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z",
    },
];

/// An SPL token known to the server scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    /// CAIP-2 network.
    pub network: &'static str,
    /// Mint address.
    pub mint: Pubkey,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Token decimals.
    pub decimals: u8,
}

/// Default token per network.
pub const DEFAULT_TOKENS: &[TokenInfo] = &[
    TokenInfo {
        network: SOLANA_MAINNET,
        mint: pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        symbol: "USDC",
        name: "USD Coin",
        decimals: DEFAULT_TOKEN_DECIMALS,
    },
    TokenInfo {
        network: SOLANA_DEVNET,
        mint: pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
        symbol: "USDC",
        name: "USD Coin (Devnet)",
        decimals: DEFAULT_TOKEN_DECIMALS,
    },
    TokenInfo {
        network: SOLANA_TESTNET,
        mint: pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
        symbol: "USDC",
        name: "USD Coin (Testnet)",
        decimals: DEFAULT_TOKEN_DECIMALS,
    },
];

/// Resolves a CAIP-2 identifier or legacy name to CAIP-2 form.
///
/// ```
/// assert_eq!(
///     t402_svm::networks::normalize("solana-devnet").as_deref(),
///     Some("solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1")
/// );
/// assert_eq!(t402_svm::networks::normalize("eip155:8453"), None);
/// ```
#[must_use]
pub fn normalize(network: &str) -> Option<String> {
    let caip2 = normalize_network(SVM_NETWORKS, network)?;
    caip2.starts_with("solana:").then(|| caip2.into_owned())
}

/// Returns the default token of a network, accepting legacy names.
#[must_use]
pub fn default_token(network: &str) -> Option<&'static TokenInfo> {
    let caip2 = normalize(network)?;
    DEFAULT_TOKENS.iter().find(|t| t.network == caip2)
}
