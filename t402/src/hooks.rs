//! Context types for client and resource-server lifecycle hooks.
//!
//! Both [`T402Client`](crate::client::T402Client) and
//! [`T402ResourceServer`](crate::server::T402ResourceServer) run hooks at
//! three points around each operation:
//!
//! - **Before**: may abort by returning [`AbortResult`]
//! - **After**: observes a successful result
//! - **On failure**: may substitute a recovered result
//!
//! Hooks run in registration order. The first abort or recovery wins.

use t402_proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1, PaymentRequirements,
    PaymentRequirementsV1, SettleResponse, VerifyResponse,
};

/// Version-tagged payment requirements, as seen by client policies and hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementsView {
    /// V1 requirements.
    V1(PaymentRequirementsV1),
    /// V2 requirements.
    V2(PaymentRequirements),
}

impl RequirementsView {
    /// Returns the scheme name.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::V1(r) => &r.scheme,
            Self::V2(r) => &r.scheme,
        }
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::V1(r) => &r.network,
            Self::V2(r) => &r.network,
        }
    }

    /// Returns the atomic amount.
    #[must_use]
    pub fn amount(&self) -> &str {
        match self {
            Self::V1(r) => r.amount(),
            Self::V2(r) => r.amount(),
        }
    }

    /// Returns the asset.
    #[must_use]
    pub fn asset(&self) -> &str {
        match self {
            Self::V1(r) => &r.asset,
            Self::V2(r) => &r.asset,
        }
    }
}

/// Version-tagged 402 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequiredView {
    /// V1 response.
    V1(PaymentRequiredV1),
    /// V2 response.
    V2(PaymentRequired),
}

/// Version-tagged payment payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadView {
    /// V1 payload.
    V1(PaymentPayloadV1),
    /// V2 payload.
    V2(Box<PaymentPayload>),
}

/// Returned by a before hook to stop the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortResult {
    /// Why the operation was stopped.
    pub reason: String,
}

impl AbortResult {
    /// Creates an abort result.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Context passed before a client creates a payment.
#[derive(Debug, Clone)]
pub struct PaymentCreationContext {
    /// The 402 response being answered.
    pub payment_required: PaymentRequiredView,
    /// The requirement chosen by policies and the selector.
    pub selected_requirements: RequirementsView,
}

/// Context passed after a client created a payment.
#[derive(Debug, Clone)]
pub struct PaymentCreatedContext {
    /// The 402 response being answered.
    pub payment_required: PaymentRequiredView,
    /// The requirement that was paid.
    pub selected_requirements: RequirementsView,
    /// The resulting payload.
    pub payment_payload: PayloadView,
}

/// Context passed when payment creation failed.
#[derive(Debug, Clone)]
pub struct PaymentCreationFailureContext {
    /// The 402 response being answered.
    pub payment_required: PaymentRequiredView,
    /// The requirement that could not be paid.
    pub selected_requirements: RequirementsView,
    /// Rendered error.
    pub error: String,
}

/// A payload supplied by a failure hook in place of the error.
///
/// Must match the version being created; a mismatched variant is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveredPayloadResult {
    /// Replacement V1 payload.
    V1(PaymentPayloadV1),
    /// Replacement V2 payload.
    V2(Box<PaymentPayload>),
}

/// Context passed to verify hooks.
#[derive(Debug, Clone)]
pub struct VerifyContext {
    /// Payload being verified.
    pub payment_payload: PaymentPayload,
    /// Requirements it is verified against.
    pub requirements: PaymentRequirements,
}

/// Context passed to after-verify hooks.
#[derive(Debug, Clone)]
pub struct VerifyResultContext {
    /// Payload that was verified.
    pub payment_payload: PaymentPayload,
    /// Requirements it was verified against.
    pub requirements: PaymentRequirements,
    /// The facilitator's answer.
    pub result: VerifyResponse,
}

/// Context passed to verify-failure hooks.
///
/// Fired for transport errors and for `isValid: false` answers; `error` is
/// the invalid reason in the latter case.
#[derive(Debug, Clone)]
pub struct VerifyFailureContext {
    /// Payload that failed.
    pub payment_payload: PaymentPayload,
    /// Requirements it was verified against.
    pub requirements: PaymentRequirements,
    /// Rendered error or invalid reason.
    pub error: String,
}

/// Replacement verify result from a failure hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredVerifyResult {
    /// The response to return instead.
    pub result: VerifyResponse,
}

/// Context passed to settle hooks.
#[derive(Debug, Clone)]
pub struct SettleContext {
    /// Payload being settled.
    pub payment_payload: PaymentPayload,
    /// Requirements being settled.
    pub requirements: PaymentRequirements,
}

/// Context passed to after-settle hooks.
#[derive(Debug, Clone)]
pub struct SettleResultContext {
    /// Payload that was settled.
    pub payment_payload: PaymentPayload,
    /// Requirements that were settled.
    pub requirements: PaymentRequirements,
    /// The facilitator's answer.
    pub result: SettleResponse,
}

/// Context passed to settle-failure hooks.
#[derive(Debug, Clone)]
pub struct SettleFailureContext {
    /// Payload that failed.
    pub payment_payload: PaymentPayload,
    /// Requirements being settled.
    pub requirements: PaymentRequirements,
    /// Rendered error or error reason.
    pub error: String,
}

/// Replacement settle result from a failure hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredSettleResult {
    /// The response to return instead.
    pub result: SettleResponse,
}
