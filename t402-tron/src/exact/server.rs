//! Server-side pricing for the TRON `exact` scheme.

use serde_json::{Map, json};
use t402::amount::{AssetAmount, Price};
use t402::error::ConfigError;
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeId, SchemeServer, merge_supported_extra};

use super::{SCHEME_EXACT, TRON_NAMESPACE};
use crate::networks::{DEFAULT_DECIMALS, default_token, find_token, normalize};

/// Server for the TRON `exact` scheme.
///
/// Money prices resolve to the network's USDT contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTronServer;

impl ExactTronServer {
    /// Creates the server scheme.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemeId for ExactTronServer {
    fn namespace(&self) -> &str {
        TRON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl SchemeServer for ExactTronServer {
    fn parse_price(&self, price: &Price, network: &str) -> Result<AssetAmount, SchemeError> {
        let token = default_token(network).ok_or_else(|| ConfigError::UnsupportedNetwork {
            family: "TRON",
            network: network.to_owned(),
        })?;
        let extra = Map::from_iter([
            ("symbol".to_owned(), json!(token.symbol)),
            ("name".to_owned(), json!(token.name)),
            ("decimals".to_owned(), json!(token.decimals)),
        ]);
        Ok(price.to_asset_amount(u32::from(token.decimals), token.contract, extra)?)
    }

    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        let Some(network) = normalize(&requirements.network) else {
            return requirements;
        };
        let (symbol, name, decimals) = find_token(&network, &requirements.asset)
            .map_or(("UNKNOWN", "Unknown TRC20", DEFAULT_DECIMALS), |t| {
                (t.symbol, t.name, t.decimals)
            });
        let extra = &mut requirements.extra;
        extra.entry("symbol").or_insert_with(|| json!(symbol));
        extra.entry("name").or_insert_with(|| json!(name));
        extra.entry("decimals").or_insert_with(|| json!(decimals));
        requirements.network = network;
        merge_supported_extra(&mut requirements, supported_kind);
        requirements
    }
}
