//! Error types for the TON `exact` scheme.

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
    /// An address field is neither friendly nor raw form.
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
    /// The sender's Jetton wallet could not be resolved.
    #[error("Failed to resolve Jetton wallet: {0}")]
    JettonWallet(String),
    /// The signer failed.
    #[error("Failed to sign message: {0}")]
    Signing(#[from] SignError),
}

/// Errors reported by a [`FacilitatorTonSigner`](super::FacilitatorTonSigner).
#[derive(Debug, thiserror::Error)]
pub enum TonFacilitatorError {
    /// A read against the chain failed.
    #[error("{0}")]
    Rpc(String),
    /// The network refused the external message.
    #[error("{0}")]
    Broadcast(String),
    /// The transaction did not appear in time.
    #[error("transaction not found after {0}s")]
    Timeout(u64),
}
