#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-155 (EVM) chain support for the t402 payment protocol.
//!
//! Implements the `exact` scheme on top of ERC-3009
//! `transferWithAuthorization`, for both protocol versions: V1 names
//! networks (`base-sepolia`), V2 uses CAIP-2 identifiers (`eip155:84532`).
//!
//! - [`exact`] - client, server and facilitator halves of the scheme
//! - [`networks`] - known chains and their default USDC deployments
//!
//! # Feature Flags
//!
//! - `provider` - JSON-RPC backed facilitator signer ([`provider::EvmProvider`])
//! - `telemetry` - tracing spans on verify and settle

pub mod exact;
pub mod networks;
#[cfg(feature = "provider")]
pub mod provider;

pub use exact::{
    EVM_NAMESPACE, ExactEvmClient, ExactEvmFacilitator, ExactEvmServer, FacilitatorEvmSigner,
    SCHEME_EXACT,
};
pub use networks::{AssetInfo, ChainId, EVM_NETWORKS, chain_id};
