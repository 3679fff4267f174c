//! TRON `exact` payment scheme.
//!
//! The payer signs a TRC-20 `transfer` transaction against a recent block
//! reference. The facilitator verifies it and broadcasts it; the payer's
//! own TRX (or staked energy) pays for execution.

pub mod client;
pub mod error;
pub mod facilitator;
pub mod server;
pub mod types;

pub use client::{ClientTronSigner, ExactTronClient, ExactTronConfig};
pub use error::{ClientError, SignError, TronFacilitatorError};
pub use facilitator::{ExactTronFacilitator, ExactTronFacilitatorConfig, FacilitatorTronSigner};
pub use server::ExactTronServer;
pub use types::{
    BlockInfo, ExactTronPayload, SignTransactionRequest, TransactionConfirmation,
    TransactionVerification, VerifyTransactionRequest,
};

/// Scheme name.
pub const SCHEME_EXACT: &str = "exact";

/// CAIP-2 namespace of TRON networks.
pub const TRON_NAMESPACE: &str = "tron";
