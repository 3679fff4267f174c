use serde_json::Value;
use t402_proto::PaymentRequirements;

use super::{BoxFuture, SchemeError, SchemeId};

/// Client half of a payment scheme.
///
/// Given the requirements a resource server published, produce the
/// scheme-specific `payload` object: a signed authorization plus whatever
/// the facilitator needs to settle it. The caller wraps the result in the
/// versioned envelope.
pub trait SchemeClient: SchemeId + Send + Sync {
    /// Builds and signs a payment for `requirements`.
    ///
    /// V1 requirements are passed through
    /// [`PaymentRequirementsV1::to_v2`](t402_proto::PaymentRequirementsV1::to_v2),
    /// so `requirements.network` may be a legacy name.
    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>>;
}
