use t402_proto::{PaymentRequirements, SupportedKind};

use super::{SchemeError, SchemeId};
use crate::amount::{AssetAmount, Price};

/// Server half of a payment scheme.
///
/// Turns a declared price into an atomic amount on the network's default
/// asset and decorates requirements with the metadata clients need to sign
/// (EIP-712 domain, token decimals, fee payer, and so on).
pub trait SchemeServer: SchemeId + Send + Sync {
    /// Converts a price to an atomic amount for `network`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the network or price when either is not
    /// supported.
    fn parse_price(&self, price: &Price, network: &str) -> Result<AssetAmount, SchemeError>;

    /// Adds family metadata to `requirements`.
    ///
    /// `supported_kind` is the facilitator's advertised kind for this
    /// scheme and network; its `extra` is merged where relevant.
    fn enhance_payment_requirements(
        &self,
        requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        extensions: &[String],
    ) -> PaymentRequirements;
}

/// Copies keys from the facilitator's advertised `extra` into
/// `requirements.extra`, keeping values already present.
pub fn merge_supported_extra(requirements: &mut PaymentRequirements, supported_kind: &SupportedKind) {
    if let Some(serde_json::Value::Object(extra)) = &supported_kind.extra {
        for (key, value) in extra {
            requirements
                .extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[test]
    fn supported_extra_does_not_override() {
        let mut requirements = PaymentRequirements {
            scheme: "exact".into(),
            network: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1".into(),
            asset: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".into(),
            amount: "1".into(),
            pay_to: "2Mw1Lw1ypjstxcXgVTXDdQtrwDCiYq3wuw7sHkUxGZfx".into(),
            max_timeout_seconds: 60,
            extra: Map::from_iter([("decimals".to_owned(), json!(6))]),
        };
        let kind = SupportedKind {
            t402_version: 2,
            scheme: "exact".into(),
            network: requirements.network.clone(),
            extra: Some(json!({"feePayer": "FeePayer111", "decimals": 9})),
        };
        merge_supported_extra(&mut requirements, &kind);
        assert_eq!(requirements.extra["feePayer"], "FeePayer111");
        assert_eq!(requirements.extra["decimals"], 6);
    }
}
