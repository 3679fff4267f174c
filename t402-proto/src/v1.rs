//! V1 legacy payment types for the t402 protocol.
//!
//! V1 uses legacy network names (`"base-sepolia"`, `"solana-devnet"`) and a
//! flat payload structure with `scheme` and `network` at the top level.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::v2::{PaymentPayload, PaymentRequirements, ResourceInfo};
use crate::{Network, T402_VERSION_V1};

/// Legacy requirements entry.
///
/// The amount lives in `maxAmountRequired`, and resource metadata sits
/// inline.
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "base-sepolia",
///   "maxAmountRequired": "1000000",
///   "resource": "/api/data",
///   "payTo": "0x...",
///   "maxTimeoutSeconds": 300,
///   "asset": "0x..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirementsV1 {
    /// Scheme name.
    pub scheme: String,

    /// Legacy network name like `base-sepolia`.
    pub network: Network,

    /// Atomic amount.
    pub max_amount_required: String,

    /// Resource URL.
    pub resource: String,

    /// Resource description.
    #[serde(default)]
    pub description: String,

    /// MIME type.
    #[serde(default)]
    pub mime_type: String,

    /// Recipient address.
    pub pay_to: String,

    /// Authorization lifetime bound.
    pub max_timeout_seconds: u64,

    /// Token address.
    pub asset: String,

    /// Response schema hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Family metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirementsV1 {
    /// `maxAmountRequired`.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.max_amount_required
    }

    /// Converts to the V2 requirements shape so V1 traffic can share the
    /// scheme implementations.
    ///
    /// A non-object `extra` is dropped.
    #[must_use]
    pub fn to_v2(&self) -> PaymentRequirements {
        PaymentRequirements {
            scheme: self.scheme.clone(),
            network: self.network.clone(),
            asset: self.asset.clone(),
            amount: self.max_amount_required.clone(),
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            extra: self
                .extra
                .as_ref()
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Returns the resource described inline by these requirements.
    #[must_use]
    pub fn resource_info(&self) -> ResourceInfo {
        ResourceInfo {
            url: self.resource.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Legacy 402 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredV1 {
    /// Always 1.
    #[serde(rename = "t402Version", default = "default_v1")]
    pub t402_version: u32,

    /// Refusal message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Accepted alternatives.
    pub accepts: Vec<PaymentRequirementsV1>,
}

/// Legacy `X-PAYMENT` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV1 {
    /// Always 1.
    #[serde(rename = "t402Version", default = "default_v1")]
    pub t402_version: u32,

    /// Payment scheme identifier.
    pub scheme: String,

    /// Network identifier.
    pub network: Network,

    /// Signed authorization.
    pub payload: Value,
}

impl PaymentPayloadV1 {
    /// Scheme name.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Wraps this payload in the V2 envelope against the given requirements.
    #[must_use]
    pub fn to_v2(&self, accepted: &PaymentRequirementsV1) -> PaymentPayload {
        PaymentPayload {
            t402_version: self.t402_version,
            payload: self.payload.clone(),
            accepted: accepted.to_v2(),
            resource: Some(accepted.resource_info()),
            extensions: None,
        }
    }
}

/// V1 supported response (no extensions or signers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponseV1 {
    /// Kinds, V1 only.
    pub kinds: Vec<crate::SupportedKind>,
}

const fn default_v1() -> u32 {
    T402_VERSION_V1
}
