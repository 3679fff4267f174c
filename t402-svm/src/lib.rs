#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana chain support for the t402 payment protocol.
//!
//! Implements the `exact` scheme with SPL Token and Token-2022
//! `TransferChecked` transactions, fee-paid by the facilitator.
//!
//! - [`exact`] - client, server and facilitator halves of the scheme
//! - [`networks`] - genesis-hash network identifiers and default mints
//!
//! # Feature Flags
//!
//! - `rpc` - Solana RPC backed facilitator signer and transaction builder
//! - `telemetry` - tracing spans on verify and settle

pub mod exact;
pub mod networks;
#[cfg(feature = "rpc")]
pub mod rpc;

pub use exact::{
    ExactSvmClient, ExactSvmFacilitator, ExactSvmServer, FacilitatorSvmSigner, SCHEME_EXACT,
    SVM_NAMESPACE,
};
