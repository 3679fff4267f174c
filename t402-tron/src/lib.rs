#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! TRON chain support for the t402 payment protocol.
//!
//! Payments are TRC-20 `transfer` transactions (USDT by default) signed by
//! the payer. The facilitator verifies the signed transaction and
//! broadcasts it.
//!
//! - [`exact`] - client, server and facilitator halves of the scheme
//! - [`networks`] - network identifiers and default tokens
//! - [`address`] - base58check addresses and hex helpers
//! - [`fees`] - fee estimation
//!
//! # Feature Flags
//!
//! - `telemetry` - tracing spans on verify and settle

pub mod address;
pub mod exact;
pub mod fees;
pub mod networks;

pub use exact::{
    ClientTronSigner, ExactTronClient, ExactTronConfig, ExactTronFacilitator, ExactTronServer,
    FacilitatorTronSigner, SCHEME_EXACT, TRON_NAMESPACE,
};
