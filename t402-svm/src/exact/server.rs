//! Server-side pricing for the Solana `exact` scheme.

use serde_json::{Map, json};
use t402::amount::{AssetAmount, Price};
use t402::error::ConfigError;
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeId, SchemeServer, merge_supported_extra};

use super::{SCHEME_EXACT, SVM_NAMESPACE};
use crate::networks::{default_token, normalize};

/// Server for the Solana `exact` scheme.
///
/// Prices resolve to the network's USDC mint. Requirements are enhanced
/// with the facilitator's `feePayer`, taken from its supported kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSvmServer;

impl ExactSvmServer {
    /// Creates the server scheme.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemeId for ExactSvmServer {
    fn namespace(&self) -> &str {
        SVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl SchemeServer for ExactSvmServer {
    fn parse_price(&self, price: &Price, network: &str) -> Result<AssetAmount, SchemeError> {
        let token = default_token(network).ok_or_else(|| ConfigError::UnsupportedNetwork {
            family: "SVM",
            network: network.to_owned(),
        })?;
        let extra = Map::from_iter([
            ("decimals".to_owned(), json!(token.decimals)),
            ("symbol".to_owned(), json!(token.symbol)),
        ]);
        Ok(price.to_asset_amount(u32::from(token.decimals), &token.mint.to_string(), extra)?)
    }

    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        if let Some(caip2) = normalize(&requirements.network) {
            requirements.network = caip2;
        }
        merge_supported_extra(&mut requirements, supported_kind);
        requirements
    }
}
