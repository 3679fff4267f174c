//! Error types for the TRON `exact` scheme.

/// The wallet signer failed.
#[derive(Debug, thiserror::Error)]
#[error("signer failed: {0}")]
pub struct SignError(pub String);

/// Errors raised while building a client payment.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required requirements field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// An address is not a valid base58check TRON address.
    #[error("Invalid {field} address: {value}")]
    InvalidAddress {
        /// Which field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The network is not a TRON network we know.
    #[error("Unsupported TRON network: {0}")]
    UnsupportedNetwork(String),
    /// The block reference could not be fetched.
    #[error("Failed to get block info: {0}")]
    BlockInfo(SignError),
    /// The signer failed.
    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] SignError),
}

/// Errors reported by a [`FacilitatorTronSigner`](super::FacilitatorTronSigner).
#[derive(Debug, thiserror::Error)]
pub enum TronFacilitatorError {
    /// A read against the full node failed.
    #[error("{0}")]
    Rpc(String),
    /// The node refused the transaction.
    #[error("{0}")]
    Broadcast(String),
    /// The transaction was not found in time.
    #[error("transaction {tx_id} not confirmed after {timeout_ms}ms")]
    Timeout {
        /// Transaction id.
        tx_id: String,
        /// How long we waited.
        timeout_ms: u64,
    },
}
