//! Wire types and signer messages for the TRON `exact` scheme.

use serde::{Deserialize, Serialize};
use t402::authorization::TronAuthorization;

/// TRC-20 `transfer(address,uint256)` selector.
pub const TRC20_TRANSFER_SELECTOR: &str = "a9059cbb";

/// TRC-20 `balanceOf(address)` selector.
pub const TRC20_BALANCE_OF_SELECTOR: &str = "70a08231";

/// Remaining validity a transaction must have to be accepted, in
/// milliseconds.
pub const MIN_VALIDITY_BUFFER_MS: u64 = 30_000;

/// How long settlement waits for confirmation, in milliseconds.
pub const CONFIRM_TIMEOUT_MS: u64 = 60_000;

/// The `payload` object of a TRON exact payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactTronPayload {
    /// Hex-encoded signed transaction.
    pub signed_transaction: String,
    /// Transfer metadata the facilitator checks the transaction against.
    pub authorization: TronAuthorization,
}

/// Reference block a transaction is built against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Bytes 6..8 of the block height, hex.
    pub ref_block_bytes: String,
    /// Bytes 8..16 of the block hash, hex.
    pub ref_block_hash: String,
    /// Transaction expiration in milliseconds; zero when the node gave none.
    pub expiration: u64,
    /// Block timestamp in milliseconds.
    pub timestamp: u64,
}

/// What a [`ClientTronSigner`](super::ClientTronSigner) is asked to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignTransactionRequest {
    /// TRC-20 contract.
    pub contract_address: String,
    /// Recipient.
    pub to: String,
    /// Amount in atomic units.
    pub amount: String,
    /// Fee limit in SUN.
    pub fee_limit: u64,
    /// Expiration in milliseconds.
    pub expiration: u64,
    /// Block reference to build against.
    pub block: BlockInfo,
}

/// Transfer the facilitator expects to find in a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTransfer {
    /// Recipient.
    pub to: String,
    /// TRC-20 contract.
    pub contract_address: String,
    /// Amount in atomic units.
    pub amount: String,
}

/// Arguments to [`FacilitatorTronSigner::verify_transaction`](super::FacilitatorTronSigner::verify_transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyTransactionRequest {
    /// Hex-encoded signed transaction.
    pub signed_transaction: String,
    /// Address that must have signed it.
    pub expected_from: String,
    /// Transfer it must carry.
    pub expected_transfer: ExpectedTransfer,
    /// CAIP-2 network.
    pub network: String,
}

/// Outcome of verifying a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionVerification {
    /// Whether the transaction checks out.
    pub valid: bool,
    /// Why not, when it does not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Transaction id, when decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

impl TransactionVerification {
    /// A passing verification.
    #[must_use]
    pub const fn valid(tx_id: Option<String>) -> Self {
        Self {
            valid: true,
            reason: None,
            tx_id,
        }
    }

    /// A failing verification.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            tx_id: None,
        }
    }
}

/// Result of waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmation {
    /// Whether the contract call succeeded.
    pub success: bool,
    /// Transaction id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Block the transaction landed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
