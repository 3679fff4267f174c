//! V2 payment types for the t402 protocol.
//!
//! These types use CAIP-2 network identifiers and carry the accepted
//! requirements inside the payment payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Network, T402_VERSION};

/// The paid resource, as shown to the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Resource URL.
    pub url: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Content type served after payment.
    #[serde(default)]
    pub mime_type: String,
}

impl ResourceInfo {
    /// Creates resource info for a URL with empty description and MIME type.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: String::new(),
            mime_type: String::new(),
        }
    }
}

/// One way to pay for a resource (an entry of `accepts`).
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "eip155:8453",
///   "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
///   "amount": "1000000",
///   "payTo": "0x...",
///   "maxTimeoutSeconds": 300,
///   "extra": {}
/// }
/// ```
///
/// `amount` is always an atomic integer encoded as a decimal string;
/// deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Scheme name; only `exact` ships today.
    pub scheme: String,

    /// CAIP-2 id such as `eip155:8453` or `ton:mainnet`.
    pub network: Network,

    /// Token contract, mint or jetton master.
    pub asset: String,

    /// Atomic units; `"1000000"` is 1 USDC.
    #[serde(deserialize_with = "deserialize_atomic_amount")]
    pub amount: String,

    /// Recipient address.
    pub pay_to: String,

    /// Upper bound on the authorization lifetime.
    pub max_timeout_seconds: u64,

    /// Family metadata: EIP-712 domain, `feePayer`, decimals.
    #[serde(default, deserialize_with = "deserialize_extra")]
    pub extra: Map<String, Value>,
}

impl PaymentRequirements {
    /// Atomic amount as sent on the wire.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Returns a string value from `extra`, if present.
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Returns `true` if `value` is a non-empty string of ASCII digits.
#[must_use]
pub fn is_atomic_amount(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn deserialize_atomic_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let s = String::deserialize(deserializer)?;
    if is_atomic_amount(&s) {
        Ok(s)
    } else {
        Err(serde::de::Error::custom(format!(
            "amount must be an integer encoded as a string, got '{s}'"
        )))
    }
}

fn deserialize_extra<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The body (and `PAYMENT-REQUIRED` header) of a 402 response.
///
/// ```json
/// {
///   "t402Version": 2,
///   "resource": { "url": "/api/data", "description": "Market data", "mimeType": "" },
///   "accepts": [{ "scheme": "exact", "network": "eip155:8453", ... }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Always 2.
    #[serde(rename = "t402Version", default = "default_v2")]
    pub t402_version: u32,

    /// Why the previous attempt was refused, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// What is being sold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Alternatives the server accepts, in preference order.
    pub accepts: Vec<PaymentRequirements>,

    /// Extension blobs keyed by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// What the client sends in `PAYMENT-SIGNATURE`.
///
/// Sent by the client to fulfill a payment requirement. The scheme-specific
/// part lives in `payload`; scheme and network travel in `accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Always 2.
    #[serde(rename = "t402Version", default = "default_v2")]
    pub t402_version: u32,

    /// Signed authorization, shaped per family.
    pub payload: Value,

    /// The entry of `accepts` this payment answers.
    pub accepted: PaymentRequirements,

    /// What is being sold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Extension blobs keyed by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl PaymentPayload {
    /// Scheme of the accepted requirements.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.accepted.scheme
    }

    /// Network of the accepted requirements.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.accepted.network
    }
}

/// Body of `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Client payment.
    pub payment_payload: PaymentPayload,

    /// Requirements the server expects.
    pub payment_requirements: PaymentRequirements,
}

/// Body of `POST /settle`.
pub type SettleRequest = VerifyRequest;

const fn default_v2() -> u32 {
    T402_VERSION
}
