//! t402 facilitator routing.
//!
//! [`T402Facilitator`] looks up the facilitator scheme for each incoming
//! payment and aggregates what the registered schemes can do into a
//! [`SupportedResponse`].

use std::sync::Arc;

use serde_json::Value;
use t402_proto::helpers::{
    PaymentPayloadEnum, PaymentRequirementsEnum, parse_payment_payload, parse_payment_requirements,
};
use t402_proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequirements, PaymentRequirementsV1, ProtocolError,
    SettleResponse, SupportedResponse, T402_VERSION, T402_VERSION_V1, VerifyResponse,
};

use crate::authorization::Authorization;
use crate::error::{PaymentError, SchemeNotFoundError};
use crate::scheme::{SchemeFacilitator, SchemeRegistry};

/// Routes verify and settle requests to registered facilitator schemes.
#[derive(Debug, Default)]
pub struct T402Facilitator {
    schemes: Arc<SchemeRegistry<dyn SchemeFacilitator>>,
    extensions: Vec<String>,
}

impl T402Facilitator {
    /// Creates a facilitator over a facilitator scheme registry.
    #[must_use]
    pub const fn new(schemes: Arc<SchemeRegistry<dyn SchemeFacilitator>>) -> Self {
        Self {
            schemes,
            extensions: Vec::new(),
        }
    }

    /// Returns the scheme registry.
    #[must_use]
    pub const fn schemes(&self) -> &Arc<SchemeRegistry<dyn SchemeFacilitator>> {
        &self.schemes
    }

    /// Advertises an extension name (e.g., `"bazaar"`).
    pub fn register_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        let extension = extension.into();
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
        self
    }

    /// Returns the advertised extension names.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Aggregates supported kinds of both protocol versions and the
    /// signer addresses per CAIP family.
    #[must_use]
    pub fn get_supported(&self) -> SupportedResponse {
        let mut kinds = self.schemes.get_supported_kinds(T402_VERSION);
        kinds.extend(self.schemes.get_supported_kinds(T402_VERSION_V1));

        let mut signers = self.schemes.get_signers_by_family(T402_VERSION);
        for (family, addresses) in self.schemes.get_signers_by_family(T402_VERSION_V1) {
            let entry = signers.entry(family).or_default();
            for address in addresses {
                if !entry.contains(&address) {
                    entry.push(address);
                }
            }
        }

        SupportedResponse::new(kinds, self.extensions.clone(), signers)
    }

    fn find(
        &self,
        version: u32,
        payload: &PaymentPayload,
    ) -> Result<Arc<dyn SchemeFacilitator>, SchemeNotFoundError> {
        self.schemes
            .get(payload.network(), payload.scheme(), version)
            .ok_or_else(|| SchemeNotFoundError::new(payload.scheme(), payload.network()))
    }

    async fn route_verify(
        &self,
        version: u32,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, PaymentError> {
        let scheme = self.find(version, payload)?;
        let payer = Authorization::decode(payload.network(), &payload.payload).ok();
        tracing::debug!(
            version,
            network = payload.network(),
            payer = payer.as_ref().map(Authorization::payer),
            "verifying payment"
        );
        let response = scheme
            .verify(payload, requirements)
            .await
            .map_err(PaymentError::Scheme)?;
        if !response.is_valid {
            tracing::debug!(
                network = payload.network(),
                reason = response.invalid_reason.as_deref(),
                "payment rejected"
            );
        }
        Ok(response)
    }

    async fn route_settle(
        &self,
        version: u32,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, PaymentError> {
        let scheme = self.find(version, payload)?;
        let response = scheme
            .settle(payload, requirements)
            .await
            .map_err(PaymentError::Scheme)?;
        if response.success {
            tracing::info!(
                network = %response.network,
                transaction = %response.transaction,
                payer = response.payer.as_deref(),
                "payment settled"
            );
        } else {
            tracing::warn!(
                network = %response.network,
                reason = response.error_reason.as_deref(),
                "settlement failed"
            );
        }
        Ok(response)
    }

    /// Verifies a V2 payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::SchemeNotFound`] when no scheme handles the
    /// payload and [`PaymentError::Scheme`] for unclassified scheme failures.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, err))]
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, PaymentError> {
        self.route_verify(T402_VERSION, payload, requirements).await
    }

    /// Settles a V2 payment. The scheme re-verifies before broadcasting.
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify).
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, err))]
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, PaymentError> {
        self.route_settle(T402_VERSION, payload, requirements).await
    }

    /// Verifies a V1 payment against V1 registrations.
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify).
    pub async fn verify_v1(
        &self,
        payload: &PaymentPayloadV1,
        requirements: &PaymentRequirementsV1,
    ) -> Result<VerifyResponse, PaymentError> {
        if let Some(reason) = v1_mismatch(payload, requirements) {
            return Ok(VerifyResponse::invalid(reason));
        }
        let converted = payload.to_v2(requirements);
        self.route_verify(T402_VERSION_V1, &converted, &converted.accepted)
            .await
    }

    /// Settles a V1 payment against V1 registrations.
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify).
    pub async fn settle_v1(
        &self,
        payload: &PaymentPayloadV1,
        requirements: &PaymentRequirementsV1,
    ) -> Result<SettleResponse, PaymentError> {
        if let Some(reason) = v1_mismatch(payload, requirements) {
            return Ok(SettleResponse::error(reason, &requirements.network));
        }
        let converted = payload.to_v2(requirements);
        self.route_settle(T402_VERSION_V1, &converted, &converted.accepted)
            .await
    }

    /// Verifies a raw `{paymentPayload, paymentRequirements}` request body of
    /// either protocol version.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Protocol`] when the body cannot be decoded,
    /// otherwise see [`verify`](Self::verify).
    pub async fn verify_raw(&self, body: &Value) -> Result<VerifyResponse, PaymentError> {
        match decode_request(body)? {
            Request::V1(payload, requirements) => self.verify_v1(&payload, &requirements).await,
            Request::V2(payload, requirements) => self.verify(&payload, &requirements).await,
        }
    }

    /// Settles a raw request body of either protocol version.
    ///
    /// # Errors
    ///
    /// See [`verify_raw`](Self::verify_raw).
    pub async fn settle_raw(&self, body: &Value) -> Result<SettleResponse, PaymentError> {
        match decode_request(body)? {
            Request::V1(payload, requirements) => self.settle_v1(&payload, &requirements).await,
            Request::V2(payload, requirements) => self.settle(&payload, &requirements).await,
        }
    }
}

/// Scheme or network disagreement between a V1 payload and its
/// requirements. The V2 envelope is rebuilt from the requirements, so the
/// payload's own claims must be compared before conversion.
fn v1_mismatch(
    payload: &PaymentPayloadV1,
    requirements: &PaymentRequirementsV1,
) -> Option<&'static str> {
    if payload.scheme() != requirements.scheme {
        Some("unsupported_scheme")
    } else if payload.network() != requirements.network {
        Some("network_mismatch")
    } else {
        None
    }
}

enum Request {
    V1(Box<PaymentPayloadV1>, Box<PaymentRequirementsV1>),
    V2(Box<PaymentPayload>, Box<PaymentRequirements>),
}

fn decode_request(body: &Value) -> Result<Request, ProtocolError> {
    let payload = body
        .get("paymentPayload")
        .ok_or(ProtocolError::MissingField("paymentPayload"))?;
    let requirements = body
        .get("paymentRequirements")
        .ok_or(ProtocolError::MissingField("paymentRequirements"))?;

    match parse_payment_payload(payload)? {
        PaymentPayloadEnum::V1(p) => match parse_payment_requirements(T402_VERSION_V1, requirements)? {
            PaymentRequirementsEnum::V1(r) => Ok(Request::V1(p, r)),
            PaymentRequirementsEnum::V2(_) => Err(ProtocolError::MissingField("maxAmountRequired")),
        },
        PaymentPayloadEnum::V2(p) => match parse_payment_requirements(T402_VERSION, requirements)? {
            PaymentRequirementsEnum::V2(r) => Ok(Request::V2(p, r)),
            PaymentRequirementsEnum::V1(_) => Err(ProtocolError::MissingField("amount")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{BoxFuture, SchemeError, SchemeId};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MinimumAmount {
        settled: AtomicBool,
    }

    impl SchemeId for MinimumAmount {
        fn namespace(&self) -> &str {
            "tron"
        }
        fn scheme(&self) -> &str {
            "exact"
        }
    }

    impl SchemeFacilitator for MinimumAmount {
        fn get_extra(&self, _network: &str) -> Option<Value> {
            Some(json!({"decimals": 6}))
        }

        fn get_signers(&self, _network: &str) -> Vec<String> {
            vec!["TFacilitator".into()]
        }

        fn verify<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
            Box::pin(async move {
                let auth = Authorization::decode("tron:*", &payload.payload)?;
                let paid: u128 = auth.amount().parse()?;
                let owed: u128 = requirements.amount.parse()?;
                Ok(if paid < owed {
                    VerifyResponse::invalid_with_payer("insufficient_amount", auth.payer())
                } else {
                    VerifyResponse::valid(auth.payer())
                })
            })
        }

        fn settle<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
            Box::pin(async move {
                let verified = self.verify(payload, requirements).await?;
                if !verified.is_valid {
                    return Ok(SettleResponse::from_invalid(verified, &requirements.network));
                }
                self.settled.store(true, Ordering::SeqCst);
                Ok(SettleResponse::success(
                    "deadbeef",
                    &requirements.network,
                    verified.payer.unwrap_or_default(),
                ))
            })
        }
    }

    fn facilitator() -> (T402Facilitator, Arc<MinimumAmount>) {
        let scheme = Arc::new(MinimumAmount {
            settled: AtomicBool::new(false),
        });
        let registry: Arc<SchemeRegistry<dyn SchemeFacilitator>> = Arc::new(SchemeRegistry::new());
        registry
            .register("tron:mainnet", Arc::clone(&scheme) as Arc<dyn SchemeFacilitator>)
            .unwrap();
        registry
            .register_v1("tron-mainnet", Arc::clone(&scheme) as Arc<dyn SchemeFacilitator>)
            .unwrap();
        (T402Facilitator::new(registry), scheme)
    }

    fn authorization(amount: &str) -> Value {
        json!({
            "from": "TPayer",
            "to": "TMerchant",
            "contractAddress": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
            "amount": amount,
            "expiration": 1_700_000_060_000_u64,
            "refBlockBytes": "abcd",
            "refBlockHash": "0011223344556677",
            "timestamp": 1_700_000_000_000_u64
        })
    }

    fn v2_body(paid: &str) -> Value {
        let requirements = json!({
            "scheme": "exact",
            "network": "tron:mainnet",
            "asset": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
            "amount": "1000000",
            "payTo": "TMerchant",
            "maxTimeoutSeconds": 300
        });
        json!({
            "paymentPayload": {
                "t402Version": 2,
                "accepted": requirements,
                "payload": {"signedTransaction": "0a02", "authorization": authorization(paid)}
            },
            "paymentRequirements": requirements
        })
    }

    #[tokio::test]
    async fn supported_lists_both_versions_and_dedups_signers() {
        let (facilitator, _) = facilitator();
        let supported = facilitator.get_supported();
        assert_eq!(supported.kinds.len(), 2);
        assert_eq!(supported.signers["tron:*"], vec!["TFacilitator".to_owned()]);
        assert_eq!(supported.kinds[0].extra, Some(json!({"decimals": 6})));
    }

    #[tokio::test]
    async fn raw_v2_amount_floor() {
        let (facilitator, scheme) = facilitator();
        let ok = facilitator.verify_raw(&v2_body("1000000")).await.unwrap();
        assert!(ok.is_valid);
        assert_eq!(ok.payer.as_deref(), Some("TPayer"));

        let short = facilitator.settle_raw(&v2_body("999999")).await.unwrap();
        assert!(!short.success);
        assert_eq!(short.error_reason.as_deref(), Some("insufficient_amount"));
        assert!(!scheme.settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn raw_v1_routes_to_v1_registration() {
        let (facilitator, scheme) = facilitator();
        let body = json!({
            "paymentPayload": {
                "t402Version": 1,
                "scheme": "exact",
                "network": "tron-mainnet",
                "payload": {"authorization": authorization("5")}
            },
            "paymentRequirements": {
                "scheme": "exact",
                "network": "tron-mainnet",
                "maxAmountRequired": "5",
                "resource": "/report",
                "payTo": "TMerchant",
                "maxTimeoutSeconds": 60,
                "asset": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"
            }
        });
        let settled = facilitator.settle_raw(&body).await.unwrap();
        assert!(settled.success);
        assert_eq!(settled.network, "tron-mainnet");
        assert!(scheme.settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn v1_payload_must_match_requirements() {
        let (facilitator, scheme) = facilitator();
        let body = |scheme: &str, network: &str| {
            json!({
                "paymentPayload": {
                    "t402Version": 1,
                    "scheme": scheme,
                    "network": network,
                    "payload": {"authorization": authorization("5")}
                },
                "paymentRequirements": {
                    "scheme": "exact",
                    "network": "tron-mainnet",
                    "maxAmountRequired": "5",
                    "resource": "/report",
                    "payTo": "TMerchant",
                    "maxTimeoutSeconds": 60,
                    "asset": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"
                }
            })
        };

        let verified = facilitator
            .verify_raw(&body("upto", "tron-mainnet"))
            .await
            .unwrap();
        assert!(!verified.is_valid);
        assert_eq!(verified.invalid_reason.as_deref(), Some("unsupported_scheme"));

        let settled = facilitator
            .settle_raw(&body("exact", "tron-shasta"))
            .await
            .unwrap();
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("network_mismatch"));
        assert_eq!(settled.network, "tron-mainnet");
        assert!(!scheme.settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_network_is_scheme_not_found() {
        let (facilitator, _) = facilitator();
        let mut body = v2_body("1");
        body["paymentPayload"]["accepted"]["network"] = json!("tron:shasta");
        let err = facilitator.verify_raw(&body).await.unwrap_err();
        assert!(matches!(err, PaymentError::SchemeNotFound(_)));
    }

    #[tokio::test]
    async fn missing_requirements_is_protocol_error() {
        let (facilitator, _) = facilitator();
        let err = facilitator
            .verify_raw(&json!({"paymentPayload": {"t402Version": 2}}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Protocol(ProtocolError::MissingField("paymentRequirements"))
        ));
    }
}
