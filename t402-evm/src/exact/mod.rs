//! EVM `exact` payment scheme.
//!
//! Payments are ERC-3009 `transferWithAuthorization` authorizations signed
//! as EIP-712 typed data. The facilitator recovers the signer locally and
//! submits the authorization on-chain to settle.

pub mod client;
pub mod error;
pub mod facilitator;
pub mod server;
pub mod types;

pub use client::{ClientEvmSigner, ExactEvmClient};
pub use error::{ClientError, EvmFacilitatorError};
pub use facilitator::{
    ExactEvmConfig, ExactEvmFacilitator, FacilitatorEvmSigner, TransactionOutcome,
};
pub use server::ExactEvmServer;
pub use types::{ExactEvmAuthorization, ExactEvmExtra, ExactEvmPayload};

/// Scheme name.
pub const SCHEME_EXACT: &str = "exact";

/// CAIP-2 namespace of EVM networks.
pub const EVM_NAMESPACE: &str = "eip155";
