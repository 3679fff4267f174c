//! Wire format types for the t402 payment protocol.
//!
//! This crate defines the serialization-level data structures shared by
//! every t402 component: resource servers, clients and facilitators. Both
//! the legacy V1 format and the current V2 format are covered.
//!
//! # Modules
//!
//! - [`v2`] - Current protocol types (`PaymentRequirements`, `PaymentPayload`, etc.)
//! - [`v1`] - Legacy protocol types (`PaymentRequirementsV1`, `PaymentPayloadV1`, etc.)
//! - [`responses`] - Facilitator responses (`VerifyResponse`, `SettleResponse`, etc.)
//! - [`helpers`] - Version detection, parsing, and network pattern matching

pub mod helpers;
pub mod responses;
pub mod v1;
pub mod v2;

pub use responses::{
    PaymentResponse, SettleResponse, SupportedKind, SupportedResponse, VerifyResponse,
};
pub use v1::{PaymentPayloadV1, PaymentRequiredV1, PaymentRequirementsV1, SupportedResponseV1};
pub use v2::{
    PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleRequest,
    VerifyRequest,
};

/// Current protocol version.
pub const T402_VERSION: u32 = 2;

/// Legacy protocol version.
pub const T402_VERSION_V1: u32 = 1;

/// CAIP-2 format network identifier (e.g., `"eip155:8453"`, `"ton:mainnet"`).
pub type Network = String;

/// Errors that can occur when parsing t402 protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The `t402Version` field is missing from the JSON data.
    #[error("missing t402Version field")]
    MissingVersion,

    /// The `t402Version` field has an unsupported value.
    #[error("invalid t402Version: {0}")]
    InvalidVersion(u64),

    /// A required field is missing from the JSON data.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// JSON deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
