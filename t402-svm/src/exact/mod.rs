//! Solana `exact` payment scheme.
//!
//! The payer signs a transaction holding an SPL `TransferChecked` of the
//! exact amount to the recipient's associated token account. The
//! facilitator is the transaction's fee payer; it co-signs, simulates and
//! submits.

pub mod client;
pub mod error;
pub mod facilitator;
pub mod server;
pub mod types;

pub use client::{ClientSvmSigner, ExactSvmClient, TransactionBuilder, TransferRequest};
pub use error::{ClientError, SignError, SvmFacilitatorError, TransactionCodecError};
pub use facilitator::{ExactSvmConfig, ExactSvmFacilitator, FacilitatorSvmSigner};
pub use server::ExactSvmServer;
pub use types::{ExactSvmPayload, TransferDetails};

/// Scheme name.
pub const SCHEME_EXACT: &str = "exact";

/// CAIP-2 namespace of Solana networks.
pub const SVM_NAMESPACE: &str = "solana";
