#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! TON chain support for the t402 payment protocol.
//!
//! Payments are TEP-74 Jetton transfers (USDT by default). The client signs
//! an external message for its own wallet; the facilitator checks it and
//! relays it unchanged, so no facilitator key is involved in the transfer.
//!
//! - [`exact`] - client, server and facilitator halves of the scheme
//! - [`networks`] - network identifiers and default Jettons
//! - [`address`] - address and BOC format checks
//!
//! Chain access is abstracted behind [`ClientTonSigner`],
//! [`FacilitatorTonSigner`] and [`exact::JettonWalletResolver`].
//!
//! # Feature Flags
//!
//! - `telemetry` - tracing spans on verify and settle

pub mod address;
pub mod exact;
pub mod networks;

pub use exact::{
    ClientTonSigner, ExactTonClient, ExactTonFacilitator, ExactTonServer, FacilitatorTonSigner,
    SCHEME_EXACT, TON_NAMESPACE,
};
