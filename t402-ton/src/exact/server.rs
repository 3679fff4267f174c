//! Server-side pricing for the TON `exact` scheme.

use serde_json::{Map, json};
use t402::amount::{AssetAmount, Price};
use t402::error::ConfigError;
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeId, SchemeServer, merge_supported_extra};

use super::{SCHEME_EXACT, TON_NAMESPACE};
use crate::networks::{UNKNOWN_JETTON_DECIMALS, default_jetton, endpoint, find_jetton, normalize};

/// Server for the TON `exact` scheme.
///
/// Money prices resolve to the network's USDT Jetton.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTonServer;

impl ExactTonServer {
    /// Creates the server scheme.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemeId for ExactTonServer {
    fn namespace(&self) -> &str {
        TON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl SchemeServer for ExactTonServer {
    fn parse_price(&self, price: &Price, network: &str) -> Result<AssetAmount, SchemeError> {
        let jetton = default_jetton(network).ok_or_else(|| ConfigError::UnsupportedNetwork {
            family: "TON",
            network: network.to_owned(),
        })?;
        let extra = Map::from_iter([
            ("symbol".to_owned(), json!(jetton.symbol)),
            ("name".to_owned(), json!(jetton.name)),
            ("decimals".to_owned(), json!(jetton.decimals)),
        ]);
        Ok(price.to_asset_amount(u32::from(jetton.decimals), jetton.master, extra)?)
    }

    /// Fills in Jetton metadata and the RPC endpoint where absent, then
    /// merges the facilitator's extra.
    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        let Some(network) = normalize(&requirements.network) else {
            return requirements;
        };
        let extra = &mut requirements.extra;
        match find_jetton(&network, &requirements.asset) {
            Some(jetton) => {
                extra.entry("symbol").or_insert_with(|| json!(jetton.symbol));
                extra.entry("name").or_insert_with(|| json!(jetton.name));
                extra.entry("decimals").or_insert_with(|| json!(jetton.decimals));
            }
            None => {
                extra.entry("symbol").or_insert_with(|| json!("UNKNOWN"));
                extra.entry("name").or_insert_with(|| json!("Unknown Jetton"));
                extra
                    .entry("decimals")
                    .or_insert_with(|| json!(UNKNOWN_JETTON_DECIMALS));
            }
        }
        if let Some(url) = endpoint(&network) {
            extra.entry("endpoint").or_insert_with(|| json!(url));
        }
        requirements.network = network;
        merge_supported_extra(&mut requirements, supported_kind);
        requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{TON_TESTNET, USDT_MAINNET, USDT_TESTNET};

    fn kind() -> SupportedKind {
        SupportedKind {
            t402_version: 2,
            scheme: "exact".into(),
            network: TON_TESTNET.into(),
            extra: None,
        }
    }

    #[test]
    fn prices_in_usdt() {
        let amount = ExactTonServer
            .parse_price(&Price::from("$0.10"), "ton-mainnet")
            .unwrap();
        assert_eq!(amount.amount, "100000");
        assert_eq!(amount.asset, USDT_MAINNET);
        assert_eq!(amount.extra["name"], "Tether USD");
    }

    #[test]
    fn unknown_network_is_named() {
        let err = ExactTonServer
            .parse_price(&Price::from("1"), "ton:devnet")
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported TON network: ton:devnet");
    }

    #[test]
    fn enhance_fills_metadata_without_overwriting() {
        let mut extra = Map::new();
        extra.insert("symbol".into(), json!("tUSDT"));
        let requirements = PaymentRequirements {
            scheme: "exact".into(),
            network: "ton-testnet".into(),
            asset: USDT_TESTNET.into(),
            amount: "1000".into(),
            pay_to: USDT_MAINNET.into(),
            max_timeout_seconds: 60,
            extra,
        };
        let enhanced = ExactTonServer.enhance_payment_requirements(requirements, &kind(), &[]);
        assert_eq!(enhanced.network, TON_TESTNET);
        assert_eq!(enhanced.extra["symbol"], "tUSDT");
        assert_eq!(enhanced.extra["decimals"], 6);
        assert_eq!(
            enhanced.extra["endpoint"],
            "https://testnet.toncenter.com/api/v2/jsonRPC"
        );
    }
}
