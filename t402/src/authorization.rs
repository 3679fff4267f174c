//! Per-family authorization records.
//!
//! Each blockchain family signs a different kind of authorization. The
//! records here are the wire shape found under `payload.authorization`;
//! [`Authorization::decode`] checks that shape once, keyed by the CAIP-2
//! namespace of the payment's network.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use t402_proto::ProtocolError;
use t402_proto::helpers::network_namespace;

/// EIP-3009 `transferWithAuthorization` parameters.
///
/// Numeric fields are decimal strings; `nonce` is a 32-byte hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmAuthorization {
    /// Token owner authorizing the transfer.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Amount in atomic units.
    pub value: String,
    /// Not valid before this Unix time.
    pub valid_after: String,
    /// Not valid at or after this Unix time.
    pub valid_before: String,
    /// Random 32-byte nonce.
    pub nonce: String,
}

/// TEP-74 Jetton transfer metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TonAuthorization {
    /// Sender wallet address.
    pub from: String,
    /// Recipient owner address.
    pub to: String,
    /// Jetton master contract address.
    pub jetton_master: String,
    /// Jetton amount in atomic units.
    pub jetton_amount: String,
    /// TON attached for gas, in nanotons.
    pub ton_amount: String,
    /// Unix time after which the message is rejected.
    pub valid_until: u64,
    /// Wallet sequence number the message was signed against.
    pub seqno: u64,
    /// Jetton transfer query id.
    pub query_id: String,
}

/// TRC-20 transfer metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TronAuthorization {
    /// Sender address (base58check, `T...`).
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// TRC-20 contract address.
    pub contract_address: String,
    /// Amount in atomic units.
    pub amount: String,
    /// Transaction expiration in milliseconds.
    pub expiration: u64,
    /// Reference block bytes (hex).
    pub ref_block_bytes: String,
    /// Reference block hash (hex).
    pub ref_block_hash: String,
    /// Transaction timestamp in milliseconds.
    pub timestamp: u64,
}

/// SPL `TransferChecked` summary, extracted from a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvmAuthorization {
    /// Transfer authority (the payer).
    pub from: String,
    /// Destination token account owner.
    pub to: String,
    /// Token mint.
    pub mint: String,
    /// Amount in atomic units.
    pub amount: String,
    /// Unix time after which the payment is stale.
    pub valid_until: u64,
    /// Fee payer requested from the facilitator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,
}

/// A family-tagged authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Authorization {
    /// EVM (`eip155:*`).
    Evm(EvmAuthorization),
    /// TON (`ton:*`).
    Ton(TonAuthorization),
    /// TRON (`tron:*`).
    Tron(TronAuthorization),
    /// Solana (`solana:*`).
    Svm(SvmAuthorization),
}

impl Authorization {
    /// Decodes `payload.authorization` according to the network's family.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingField`] when the payload has no
    /// `authorization` or the namespace is not a known family, and
    /// [`ProtocolError::Json`] when the shape does not match.
    pub fn decode(network: &str, payload: &Value) -> Result<Self, ProtocolError> {
        let raw = payload
            .get("authorization")
            .cloned()
            .ok_or(ProtocolError::MissingField("authorization"))?;
        let decoded = match network_namespace(network) {
            "eip155" => Self::Evm(serde_json::from_value(raw)?),
            "ton" => Self::Ton(serde_json::from_value(raw)?),
            "tron" => Self::Tron(serde_json::from_value(raw)?),
            "solana" => Self::Svm(serde_json::from_value(raw)?),
            _ => return Err(ProtocolError::MissingField("network")),
        };
        Ok(decoded)
    }

    /// Returns the payer address.
    #[must_use]
    pub fn payer(&self) -> &str {
        match self {
            Self::Evm(a) => &a.from,
            Self::Ton(a) => &a.from,
            Self::Tron(a) => &a.from,
            Self::Svm(a) => &a.from,
        }
    }

    /// Returns the recipient address.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::Evm(a) => &a.to,
            Self::Ton(a) => &a.to,
            Self::Tron(a) => &a.to,
            Self::Svm(a) => &a.to,
        }
    }

    /// Returns the authorized amount in atomic units.
    #[must_use]
    pub fn amount(&self) -> &str {
        match self {
            Self::Evm(a) => &a.value,
            Self::Ton(a) => &a.jetton_amount,
            Self::Tron(a) => &a.amount,
            Self::Svm(a) => &a.amount,
        }
    }
}
