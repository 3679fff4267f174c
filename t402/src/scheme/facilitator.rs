use serde_json::Value;
use t402_proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};

use super::{BoxFuture, SchemeError, SchemeId};

/// Facilitator half of a payment scheme.
///
/// `verify` has no side effects. `settle` always re-runs `verify` and
/// broadcasts only when it passes. Rejections are reported through the
/// response objects; `Err` is reserved for failures the scheme could not
/// classify.
pub trait SchemeFacilitator: SchemeId + Send + Sync {
    /// Extra data advertised in the supported kind for `network`.
    fn get_extra(&self, _network: &str) -> Option<Value> {
        None
    }

    /// Addresses this facilitator signs or pays fees with on `network`.
    fn get_signers(&self, network: &str) -> Vec<String>;

    /// Checks a payment against its requirements.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>>;

    /// Verifies, then executes the payment on-chain.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>>;
}
