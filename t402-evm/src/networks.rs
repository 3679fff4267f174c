//! Known EVM networks and their USDC deployments.

use alloy_primitives::{Address, address};
use t402::networks::{NetworkInfo, normalize_network};

/// An EIP-155 chain ID (e.g., 8453 for Base, 137 for Polygon).
pub type ChainId = u64;

/// Base Mainnet chain ID.
pub const BASE_MAINNET: ChainId = 8453;

/// Base Sepolia (testnet) chain ID.
pub const BASE_SEPOLIA: ChainId = 84532;

/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET: ChainId = 1;

/// Polygon Mainnet chain ID.
pub const POLYGON_MAINNET: ChainId = 137;

/// Polygon Amoy (testnet) chain ID.
pub const POLYGON_AMOY: ChainId = 80002;

/// Avalanche C-Chain chain ID.
pub const AVALANCHE_MAINNET: ChainId = 43114;

/// Avalanche Fuji (testnet) chain ID.
pub const AVALANCHE_FUJI: ChainId = 43113;

/// Celo Mainnet chain ID.
pub const CELO_MAINNET: ChainId = 42220;

/// Default EIP-712 domain name for USDC.
pub const DEFAULT_USDC_NAME: &str = "USD Coin";

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_USDC_VERSION: &str = "2";

/// Default token decimals for USDC.
pub const DEFAULT_TOKEN_DECIMALS: u32 = 6;

/// Legacy V1 network names.
pub const EVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "base",
        namespace: "eip155",
        reference: "8453",
    },
    NetworkInfo {
        name: "base-sepolia",
        namespace: "eip155",
        reference: "84532",
    },
    NetworkInfo {
        name: "ethereum",
        namespace: "eip155",
        reference: "1",
    },
    NetworkInfo {
        name: "polygon",
        namespace: "eip155",
        reference: "137",
    },
    NetworkInfo {
        name: "polygon-amoy",
        namespace: "eip155",
        reference: "80002",
    },
    NetworkInfo {
        name: "avalanche",
        namespace: "eip155",
        reference: "43114",
    },
    NetworkInfo {
        name: "avalanche-fuji",
        namespace: "eip155",
        reference: "43113",
    },
    NetworkInfo {
        name: "celo",
        namespace: "eip155",
        reference: "42220",
    },
];

/// Default token of a network, with the EIP-712 domain it signs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    /// Chain the token is deployed on.
    pub chain_id: ChainId,
    /// Contract address.
    pub address: Address,
    /// Number of decimals.
    pub decimals: u32,
    /// EIP-712 domain name.
    pub name: &'static str,
    /// EIP-712 domain version.
    pub version: &'static str,
}

const fn usdc(chain_id: ChainId, address: Address) -> AssetInfo {
    AssetInfo {
        chain_id,
        address,
        decimals: DEFAULT_TOKEN_DECIMALS,
        name: DEFAULT_USDC_NAME,
        version: DEFAULT_USDC_VERSION,
    }
}

/// USDC deployments per chain.
pub const DEFAULT_ASSETS: &[AssetInfo] = &[
    usdc(
        BASE_MAINNET,
        address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    ),
    usdc(
        BASE_SEPOLIA,
        address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
    ),
    usdc(
        ETHEREUM_MAINNET,
        address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    ),
    usdc(
        POLYGON_MAINNET,
        address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
    ),
    usdc(
        POLYGON_AMOY,
        address!("41E94Eb71Ef8C9fAE0235d1e472b21E21B5a4dbF"),
    ),
    usdc(
        AVALANCHE_MAINNET,
        address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    ),
    usdc(
        AVALANCHE_FUJI,
        address!("5425890298aed601595a70AB815c96711a31Bc65"),
    ),
    usdc(
        CELO_MAINNET,
        address!("cebA9300f2b948710d2653dD7B07f33A8B32118C"),
    ),
];

/// Formats a chain ID as a CAIP-2 identifier.
#[must_use]
pub fn caip2(chain_id: ChainId) -> String {
    format!("eip155:{chain_id}")
}

/// Resolves a CAIP-2 identifier or legacy name to a chain ID.
///
/// ```
/// assert_eq!(t402_evm::chain_id("eip155:8453"), Some(8453));
/// assert_eq!(t402_evm::chain_id("base-sepolia"), Some(84532));
/// assert_eq!(t402_evm::chain_id("solana:mainnet"), None);
/// ```
#[must_use]
pub fn chain_id(network: &str) -> Option<ChainId> {
    normalize_network(EVM_NETWORKS, network)?
        .strip_prefix("eip155:")
        .and_then(|s| s.parse().ok())
}

/// Returns the default token deployed on a chain.
#[must_use]
pub fn default_asset(chain_id: ChainId) -> Option<&'static AssetInfo> {
    DEFAULT_ASSETS.iter().find(|a| a.chain_id == chain_id)
}

/// Looks up a known token by chain and address.
#[must_use]
pub fn find_asset(chain_id: ChainId, address: Address) -> Option<&'static AssetInfo> {
    DEFAULT_ASSETS
        .iter()
        .find(|a| a.chain_id == chain_id && a.address == address)
}

/// Returns the CAIP-2 identifiers of every network with a default asset.
#[must_use]
pub fn known_network_ids() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|a| caip2(a.chain_id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_legacy_name_has_a_default_asset() {
        for info in EVM_NETWORKS {
            let id = chain_id(info.name).unwrap();
            assert!(default_asset(id).is_some(), "{}", info.name);
        }
    }

    #[test]
    fn unknown_networks_have_no_chain_id() {
        assert_eq!(chain_id("eip155:abc"), None);
        assert_eq!(chain_id("optimism-goerli"), None);
    }
}
