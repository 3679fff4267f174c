//! Wire types and signer messages for the TON `exact` scheme.

use serde::{Deserialize, Serialize};
use t402::authorization::TonAuthorization;

/// TEP-74 `transfer` op code.
pub const JETTON_TRANSFER_OP: u32 = 0x0f8a_7ea5;

/// TEP-74 `internal_transfer` op code.
pub const JETTON_INTERNAL_TRANSFER_OP: u32 = 0x178d_4519;

/// TEP-74 `transfer_notification` op code.
pub const JETTON_TRANSFER_NOTIFICATION_OP: u32 = 0x7362_d09c;

/// TON attached for gas by default, in nanotons (0.1 TON).
pub const DEFAULT_JETTON_TRANSFER_TON: u64 = 100_000_000;

/// Lowest gas attachment accepted by the client, in nanotons.
pub const MIN_JETTON_TRANSFER_TON: u64 = 50_000_000;

/// Highest gas attachment accepted by the client, in nanotons.
pub const MAX_JETTON_TRANSFER_TON: u64 = 500_000_000;

/// Forward amount for the transfer notification, in nanotons.
pub const DEFAULT_FORWARD_TON: u64 = 1;

/// Default message validity, in seconds.
pub const DEFAULT_VALIDITY_DURATION: u64 = 3600;

/// Remaining validity a message must have to be accepted, in seconds.
pub const MIN_VALIDITY_BUFFER: u64 = 30;

/// The `payload` object of a TON exact payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactTonPayload {
    /// Base64 BOC of the signed external message.
    pub signed_boc: String,
    /// Transfer metadata the facilitator checks the BOC against.
    pub authorization: TonAuthorization,
}

/// Body of a TEP-74 Jetton `transfer` message.
///
/// Serialized into a cell by the signer:
/// `transfer#0f8a7ea5 query_id:uint64 amount:(VarUInteger 16)
/// destination:MsgAddress response_destination:MsgAddress
/// custom_payload:(Maybe ^Cell) forward_ton_amount:(VarUInteger 16)
/// forward_payload:(Either Cell ^Cell)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JettonTransferBody {
    /// Op code, always [`JETTON_TRANSFER_OP`].
    pub op: u32,
    /// Random query id.
    pub query_id: u64,
    /// Jetton amount in atomic units.
    pub amount: u128,
    /// Owner address of the recipient.
    pub destination: String,
    /// Where excess TON is returned.
    pub response_destination: String,
    /// TON forwarded with the transfer notification, in nanotons.
    pub forward_ton_amount: u64,
}

/// What a [`ClientTonSigner`](super::ClientTonSigner) is asked to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageRequest {
    /// The sender's Jetton wallet, which receives the internal message.
    pub to: String,
    /// TON attached for gas, in nanotons.
    pub value: u64,
    /// Transfer body.
    pub body: JettonTransferBody,
    /// Message validity from now, in seconds.
    pub timeout: u64,
    /// Wallet sequence number to sign against.
    pub seqno: u64,
}

/// Transfer the facilitator expects to find in a signed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTransfer {
    /// Jetton amount in atomic units.
    pub jetton_amount: String,
    /// Recipient owner address.
    pub destination: String,
    /// Jetton master address.
    pub jetton_master: String,
}

/// Arguments to [`FacilitatorTonSigner::verify_message`](super::FacilitatorTonSigner::verify_message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyMessageRequest {
    /// Base64 BOC to verify.
    pub signed_boc: String,
    /// Wallet that must have signed it.
    pub expected_from: String,
    /// The sender's Jetton wallet the message must target.
    pub jetton_wallet: String,
    /// Transfer the message must carry.
    pub expected_transfer: ExpectedTransfer,
    /// CAIP-2 network.
    pub network: String,
}

/// Transfer fields decoded from a signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInfo {
    /// Sender wallet.
    pub from: String,
    /// Recipient owner address.
    pub to: String,
    /// Jetton amount in atomic units.
    pub jetton_amount: String,
    /// Query id.
    pub query_id: String,
}

/// Outcome of verifying a signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageVerification {
    /// Whether the message checks out.
    pub valid: bool,
    /// Why not, when it does not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Decoded transfer, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferInfo>,
}

impl MessageVerification {
    /// A passing verification.
    #[must_use]
    pub const fn valid(transfer: Option<TransferInfo>) -> Self {
        Self {
            valid: true,
            reason: None,
            transfer,
        }
    }

    /// A failing verification.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            transfer: None,
        }
    }
}

/// Arguments to [`FacilitatorTonSigner::wait_for_transaction`](super::FacilitatorTonSigner::wait_for_transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForTransactionRequest {
    /// Sender wallet.
    pub address: String,
    /// Seqno the wallet must advance past.
    pub seqno: u64,
    /// Give up after this many seconds.
    pub timeout_secs: u64,
    /// CAIP-2 network.
    pub network: String,
}

/// Result of waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmation {
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// Logical time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<String>,
    /// Transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_wire_shape() {
        let payload: ExactTonPayload = serde_json::from_value(json!({
            "signedBoc": "te6cckEBAQEAAgAAAEysuc0=",
            "authorization": {
                "from": "EQAAFhjXzKuQ5N0c96nsdZQWATcJm909LYSaCAvWFxVJP80D",
                "to": "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs",
                "jettonMaster": "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs",
                "jettonAmount": "1000000",
                "tonAmount": "100000000",
                "validUntil": 1_700_000_000_u64,
                "seqno": 5,
                "queryId": "42"
            }
        }))
        .unwrap();
        assert_eq!(payload.authorization.seqno, 5);
        assert_eq!(payload.authorization.jetton_amount, "1000000");
    }

    #[test]
    fn transfer_body_uses_tep74_op() {
        let body = JettonTransferBody {
            op: JETTON_TRANSFER_OP,
            query_id: 1,
            amount: 1,
            destination: String::new(),
            response_destination: String::new(),
            forward_ton_amount: DEFAULT_FORWARD_TON,
        };
        assert_eq!(serde_json::to_value(&body).unwrap()["op"], 260_734_629);
    }
}
