//! Facilitator response types for the t402 protocol.
//!
//! Verification and settlement outcomes are data, not errors: an invalid
//! payment is reported through [`VerifyResponse::is_valid`] and a failed
//! settlement through [`SettleResponse::success`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Network;
use crate::v2::PaymentRequirements;

/// Outcome of `POST /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// `true` when every check passed.
    pub is_valid: bool,

    /// Reason code of the first failed check, e.g. `insufficient_amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    /// Free-form detail for the reason code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,

    /// Paying address, once decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    /// Accepted payment from `payer`.
    #[must_use]
    pub fn valid(payer: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            invalid_message: None,
            payer: Some(payer.into()),
        }
    }

    /// Rejection before the payer was known.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            invalid_message: None,
            payer: None,
        }
    }

    /// Rejection naming the payer.
    #[must_use]
    pub fn invalid_with_payer(reason: impl Into<String>, payer: impl Into<String>) -> Self {
        Self {
            payer: Some(payer.into()),
            ..Self::invalid(reason)
        }
    }

    /// Adds `invalidMessage`.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(message.into());
        self
    }
}

/// Outcome of `POST /settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// `true` once the transfer is confirmed on chain.
    pub success: bool,

    /// Reason code when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Free-form detail, e.g. the RPC error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Paying address, once decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// Transaction hash or id. Empty when nothing was broadcast.
    #[serde(default)]
    pub transaction: String,

    /// Network the settlement targeted.
    pub network: Network,
}

impl SettleResponse {
    /// Confirmed settlement.
    #[must_use]
    pub fn success(
        transaction: impl Into<String>,
        network: impl Into<String>,
        payer: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            error_reason: None,
            error_message: None,
            payer: Some(payer.into()),
            transaction: transaction.into(),
            network: network.into(),
        }
    }

    /// Failed settlement with a reason code and nothing broadcast.
    #[must_use]
    pub fn error(reason: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.into()),
            error_message: None,
            payer: None,
            transaction: String::new(),
            network: network.into(),
        }
    }

    /// Carries a rejected verification over to settlement.
    #[must_use]
    pub fn from_invalid(verify: VerifyResponse, network: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: verify.invalid_reason,
            error_message: verify.invalid_message,
            payer: verify.payer,
            transaction: String::new(),
            network: network.into(),
        }
    }

    /// Overrides the payer.
    #[must_use]
    pub fn with_payer(mut self, payer: impl Into<String>) -> Self {
        self.payer = Some(payer.into());
        self
    }

    /// Records the transaction id.
    #[must_use]
    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = transaction.into();
        self
    }

    /// Adds `errorMessage`.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Settlement result returned to the client in the `PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Mirrors [`SettleResponse::success`].
    pub success: bool,

    /// Mirrors [`SettleResponse::error_reason`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Paying address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// Settlement transaction, empty on failure.
    pub transaction: String,

    /// Settlement network.
    pub network: Network,

    /// Requirements the payment was settled against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<PaymentRequirements>,
}

impl PaymentResponse {
    /// Header form of a settlement.
    #[must_use]
    pub fn from_settle(settle: SettleResponse, requirements: Option<PaymentRequirements>) -> Self {
        Self {
            success: settle.success,
            error_reason: settle.error_reason,
            payer: settle.payer,
            transaction: settle.transaction,
            network: settle.network,
            requirements,
        }
    }
}

/// One `(version, scheme, network)` triple a facilitator can settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    /// Protocol version of this kind.
    #[serde(rename = "t402Version")]
    pub t402_version: u32,

    /// Scheme name, e.g. `exact`.
    pub scheme: String,

    /// CAIP-2 network id.
    pub network: Network,

    /// Scheme metadata for clients, e.g. the fee payer or token decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Body of `GET /supported`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// Settleable kinds across both versions.
    pub kinds: Vec<SupportedKind>,

    /// Advertised protocol extensions.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Facilitator addresses per family wildcard, e.g. `eip155:*`.
    #[serde(default)]
    pub signers: HashMap<String, Vec<String>>,
}

impl SupportedResponse {
    /// Assembles a response.
    #[must_use]
    pub const fn new(
        kinds: Vec<SupportedKind>,
        extensions: Vec<String>,
        signers: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            kinds,
            extensions,
            signers,
        }
    }
}
