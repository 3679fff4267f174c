//! Server-side pricing for the EVM `exact` scheme.

use serde_json::{Map, Value, json};
use t402::amount::{AssetAmount, Price};
use t402::error::ConfigError;
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeId, SchemeServer, merge_supported_extra};

use super::{EVM_NAMESPACE, SCHEME_EXACT};
use crate::networks::{
    AssetInfo, DEFAULT_ASSETS, DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION, chain_id,
};

/// Server for the EVM `exact` scheme.
///
/// Prices default to USDC on the requested chain. Additional tokens can be
/// registered with [`with_asset`](Self::with_asset); the last registration
/// for a chain becomes its default.
#[derive(Debug, Clone)]
pub struct ExactEvmServer {
    assets: Vec<AssetInfo>,
}

impl Default for ExactEvmServer {
    fn default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.to_vec(),
        }
    }
}

impl ExactEvmServer {
    /// Creates a server with the built-in USDC table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token and makes it the default for its chain.
    #[must_use]
    pub fn with_asset(mut self, asset: AssetInfo) -> Self {
        self.assets.insert(0, asset);
        self
    }

    fn default_asset(&self, network: &str) -> Option<&AssetInfo> {
        let id = chain_id(network)?;
        self.assets.iter().find(|a| a.chain_id == id)
    }

    fn known_asset(&self, network: &str, asset: &str) -> Option<&AssetInfo> {
        let id = chain_id(network)?;
        let address: alloy_primitives::Address = asset.parse().ok()?;
        self.assets
            .iter()
            .find(|a| a.chain_id == id && a.address == address)
    }
}

impl SchemeId for ExactEvmServer {
    fn namespace(&self) -> &str {
        EVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl SchemeServer for ExactEvmServer {
    fn parse_price(&self, price: &Price, network: &str) -> Result<AssetAmount, SchemeError> {
        let asset = self
            .default_asset(network)
            .ok_or_else(|| ConfigError::UnsupportedNetwork {
                family: "EVM",
                network: network.to_owned(),
            })?;
        let extra = Map::from_iter([
            ("name".to_owned(), json!(asset.name)),
            ("version".to_owned(), json!(asset.version)),
            ("decimals".to_owned(), json!(asset.decimals)),
        ]);
        Ok(price.to_asset_amount(asset.decimals, &asset.address.to_checksum(None), extra)?)
    }

    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        let (name, version) = self
            .known_asset(&requirements.network, &requirements.asset)
            .map_or((DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION), |a| {
                (a.name, a.version)
            });
        requirements
            .extra
            .entry("name")
            .or_insert_with(|| Value::from(name));
        requirements
            .extra
            .entry("version")
            .or_insert_with(|| Value::from(version));
        merge_supported_extra(&mut requirements, supported_kind);
        requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn dollar_prices_use_usdc_decimals() {
        let server = ExactEvmServer::new();
        let amount = server
            .parse_price(&Price::from("$0.10"), "eip155:8453")
            .unwrap();
        assert_eq!(amount.amount, "100000");
        assert_eq!(amount.asset, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
        assert_eq!(amount.extra["name"], "USD Coin");
        assert_eq!(amount.extra["decimals"], 6);

        let amount = server.parse_price(&Price::from("1.00"), "base").unwrap();
        assert_eq!(amount.amount, "1000000");
    }

    #[test]
    fn unsupported_network_is_named() {
        let err = ExactEvmServer::new()
            .parse_price(&Price::from("$1"), "eip155:999999")
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported EVM network: eip155:999999");
    }

    #[test]
    fn custom_asset_becomes_default() {
        let server = ExactEvmServer::new().with_asset(AssetInfo {
            chain_id: 8453,
            address: address!("fde4C96c8593536E31F229EA8f37b2ADa2699bb2"),
            decimals: 6,
            name: "Tether USD",
            version: "1",
        });
        let amount = server.parse_price(&Price::from("2"), "eip155:8453").unwrap();
        assert_eq!(amount.extra["name"], "Tether USD");
        assert_eq!(amount.amount, "2000000");
    }

    #[test]
    fn enhance_fills_domain_without_overriding() {
        let server = ExactEvmServer::new();
        let mut requirements = PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:84532".into(),
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            amount: "1000".into(),
            pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
            max_timeout_seconds: 300,
            extra: Map::new(),
        };
        requirements.extra.insert("version".into(), json!("3"));
        let kind = SupportedKind {
            t402_version: 2,
            scheme: "exact".into(),
            network: "eip155:84532".into(),
            extra: None,
        };
        let enhanced = server.enhance_payment_requirements(requirements, &kind, &[]);
        assert_eq!(enhanced.extra["name"], "USD Coin");
        assert_eq!(enhanced.extra["version"], "3");
    }
}
