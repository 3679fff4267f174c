//! Error types for the Solana `exact` scheme.

use solana_pubkey::Pubkey;

/// A transaction could not be moved between its wire and in-memory forms.
#[derive(Debug, thiserror::Error)]
pub enum TransactionCodecError {
    /// The string is not valid base64.
    #[error("transaction is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The bytes are not a bincode `VersionedTransaction`.
    #[error("transaction is not a valid versioned transaction: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Signing a transaction failed.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The key is not one of the transaction's required signers.
    #[error("{0} is not a required signer of this transaction")]
    NotARequiredSigner(Pubkey),
    /// The underlying signer failed.
    #[error("signer failed: {0}")]
    Signer(String),
}

/// Errors raised while building a client payment.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required requirements field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// An address field is not a base58 public key.
    #[error("Invalid {field} address: {value}")]
    InvalidAddress {
        /// Which field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The amount is not a base-10 `u64`.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// The transaction builder failed.
    #[error("Failed to build transaction: {0}")]
    Build(String),
    /// The signer failed.
    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] SignError),
    /// The signed transaction could not be encoded.
    #[error(transparent)]
    Codec(#[from] TransactionCodecError),
}

/// Errors reported by a [`FacilitatorSvmSigner`](super::FacilitatorSvmSigner).
#[derive(Debug, thiserror::Error)]
pub enum SvmFacilitatorError {
    /// Co-signing failed.
    #[error(transparent)]
    Signing(#[from] SignError),
    /// No managed key matches the requested fee payer.
    #[error("fee payer {0} is not managed by this facilitator")]
    UnknownFeePayer(Pubkey),
    /// Simulation returned an error.
    #[error("{0}")]
    Simulation(String),
    /// Submitting the transaction failed.
    #[error("{0}")]
    Broadcast(String),
    /// Confirmation failed or timed out.
    #[error("{0}")]
    Confirmation(String),
}
