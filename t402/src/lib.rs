#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types and orchestration for the t402 payment protocol.
//!
//! t402 carries micropayments over HTTP using the 402 Payment Required
//! status code. A resource server answers with payment requirements, the
//! client signs a chain-specific authorization, and a facilitator verifies
//! and settles it. This crate is chain-agnostic; each blockchain family
//! (EVM, Solana, TON, TRON) plugs in through the scheme traits.
//!
//! # Modules
//!
//! - [`amount`] - Price parsing and atomic amount conversion
//! - [`authorization`] - Per-family authorization records
//! - [`client`] - [`T402Client`](client::T402Client), requirement selection and payload creation
//! - [`config`] - Resource configuration
//! - [`error`] - Error types
//! - [`facilitator`] - [`T402Facilitator`](facilitator::T402Facilitator), verify/settle routing
//! - [`hooks`] - Context types passed to lifecycle hooks
//! - [`networks`] - Legacy network name tables
//! - [`scheme`] - Scheme traits and the network-pattern registry
//! - [`server`] - [`T402ResourceServer`](server::T402ResourceServer)
//! - [`timestamp`] - Unix timestamps for authorization windows
//!
//! # Feature Flags
//!
//! - `telemetry` - Adds tracing spans around verify/settle

pub mod amount;
pub mod authorization;
pub mod client;
pub mod config;
pub mod error;
pub mod facilitator;
pub mod hooks;
pub mod networks;
pub mod scheme;
pub mod server;
pub mod timestamp;

pub use t402_proto as proto;
