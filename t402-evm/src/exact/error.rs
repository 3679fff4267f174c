//! Error types for the EVM `exact` scheme.

/// Errors raised while building a client payment.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required requirements field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// An address field is not `0x` + 40 hex characters.
    #[error("Invalid {field} address: {value}")]
    InvalidAddress {
        /// Which field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The amount is not a base-10 integer.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// The network has no known chain ID.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    /// The signer failed.
    #[error("Failed to sign authorization: {0}")]
    Signing(#[from] alloy_signer::Error),
}

/// Errors reported by a [`FacilitatorEvmSigner`](super::FacilitatorEvmSigner).
#[derive(Debug, thiserror::Error)]
pub enum EvmFacilitatorError {
    /// An RPC read failed.
    #[error("RPC call failed: {0}")]
    Rpc(String),
    /// Submitting the settlement transaction failed.
    #[error("Transaction submission failed: {0}")]
    Broadcast(String),
    /// Waiting for the receipt failed or timed out.
    #[error("Receipt not available: {0}")]
    Confirmation(String),
}
