//! TON `exact` payment scheme.
//!
//! The payer signs an external message to its wallet contract that sends a
//! Jetton `transfer` to its own Jetton wallet. The facilitator verifies the
//! message against the requirements and broadcasts it as is.

pub mod client;
pub mod error;
pub mod facilitator;
pub mod server;
pub mod types;

pub use client::{ClientTonSigner, ExactTonClient, ExactTonClientConfig, JettonWalletResolver};
pub use error::{ClientError, SignError, TonFacilitatorError};
pub use facilitator::{ExactTonFacilitator, FacilitatorTonSigner};
pub use server::ExactTonServer;
pub use types::{
    ExactTonPayload, JettonTransferBody, MessageVerification, SignMessageRequest,
    TransactionConfirmation, VerifyMessageRequest, WaitForTransactionRequest,
};

/// Scheme name.
pub const SCHEME_EXACT: &str = "exact";

/// CAIP-2 namespace of TON networks.
pub const TON_NAMESPACE: &str = "ton";
