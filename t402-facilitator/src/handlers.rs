//! Axum handlers for the facilitator HTTP API.
//!
//! `/verify` and `/settle` accept `{paymentPayload, paymentRequirements}`
//! bodies of either protocol version; the version is read from the payload.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use t402::facilitator::T402Facilitator;
use t402::proto::{SettleResponse, SupportedResponse, VerifyResponse};

use crate::error::FacilitatorError;

/// Shared state of the facilitator service.
pub type FacilitatorState = Arc<T402Facilitator>;

/// `GET /supported`: kinds, extensions and signer addresses.
pub async fn get_supported(State(facilitator): State<FacilitatorState>) -> Json<SupportedResponse> {
    Json(facilitator.get_supported())
}

/// `POST /verify`
///
/// # Errors
///
/// 404 when no scheme serves the payload network, 400 on a malformed body.
#[cfg_attr(feature = "telemetry", tracing::instrument(skip_all))]
pub async fn post_verify(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<Value>,
) -> Result<Json<VerifyResponse>, FacilitatorError> {
    Ok(Json(facilitator.verify_raw(&body).await?))
}

/// `POST /settle`
///
/// # Errors
///
/// Same as [`post_verify`].
#[cfg_attr(feature = "telemetry", tracing::instrument(skip_all))]
pub async fn post_settle(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<Value>,
) -> Result<Json<SettleResponse>, FacilitatorError> {
    let response = facilitator.settle_raw(&body).await?;
    if response.success {
        tracing::info!(
            network = %response.network,
            transaction = %response.transaction,
            "payment settled"
        );
    }
    Ok(Json(response))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Routes `/supported`, `/verify`, `/settle` and `/health`.
pub fn facilitator_router(state: FacilitatorState) -> Router {
    Router::new()
        .route("/supported", get(get_supported))
        .route("/verify", post(post_verify))
        .route("/settle", post(post_settle))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use t402::proto::{PaymentPayload, PaymentRequirements};
    use t402::scheme::{BoxFuture, SchemeError, SchemeFacilitator, SchemeId, SchemeRegistry};

    #[derive(Default)]
    struct Mock {
        settled: AtomicBool,
    }

    impl SchemeId for Mock {
        fn namespace(&self) -> &str {
            "eip155"
        }
        fn scheme(&self) -> &str {
            "exact"
        }
    }

    impl SchemeFacilitator for Mock {
        fn get_signers(&self, _network: &str) -> Vec<String> {
            vec!["0xFacilitator".into()]
        }

        fn verify<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
            Box::pin(async move {
                Ok(match payload.payload["signature"].as_str() {
                    Some("0xgood") => VerifyResponse::valid("0xPayer"),
                    Some("0xboom") => return Err("rpc unavailable".into()),
                    _ => VerifyResponse::invalid_with_payer("invalid_signature", "0xPayer"),
                })
            })
        }

        fn settle<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
            Box::pin(async move {
                let verified = self.verify(payload, requirements).await?;
                if !verified.is_valid {
                    return Ok(SettleResponse::from_invalid(verified, &requirements.network));
                }
                self.settled.store(true, Ordering::SeqCst);
                Ok(SettleResponse::success("0xtx", &requirements.network, "0xPayer"))
            })
        }
    }

    fn state() -> (FacilitatorState, Arc<Mock>) {
        let mock = Arc::new(Mock::default());
        let registry: Arc<SchemeRegistry<dyn SchemeFacilitator>> = Arc::new(SchemeRegistry::new());
        registry
            .register("eip155:84532", Arc::clone(&mock) as Arc<dyn SchemeFacilitator>)
            .unwrap();
        (Arc::new(T402Facilitator::new(registry)), mock)
    }

    fn body(network: &str, signature: &str) -> Value {
        let requirements = json!({
            "scheme": "exact",
            "network": network,
            "asset": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            "amount": "10000",
            "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
            "maxTimeoutSeconds": 60
        });
        json!({
            "t402Version": 2,
            "paymentPayload": {
                "t402Version": 2,
                "payload": { "signature": signature },
                "accepted": requirements
            },
            "paymentRequirements": requirements
        })
    }

    #[tokio::test]
    async fn supported_lists_registered_kind_and_signer() {
        let (state, _) = state();
        let Json(supported) = get_supported(State(state)).await;
        assert_eq!(supported.kinds.len(), 1);
        assert_eq!(supported.kinds[0].network, "eip155:84532");
        assert_eq!(supported.signers["eip155:*"], vec!["0xFacilitator"]);
    }

    #[tokio::test]
    async fn invalid_payment_is_ok_with_reason() {
        let (state, _) = state();
        let Json(response) = post_verify(State(state), Json(body("eip155:84532", "0xbad")))
            .await
            .unwrap();
        assert!(!response.is_valid);
        assert_eq!(response.invalid_reason.as_deref(), Some("invalid_signature"));
    }

    #[tokio::test]
    async fn settle_reaches_the_scheme() {
        let (state, mock) = state();
        let Json(response) = post_settle(State(state), Json(body("eip155:84532", "0xgood")))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.transaction, "0xtx");
        assert!(mock.settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rejected_settle_does_not_submit() {
        let (state, mock) = state();
        let Json(response) = post_settle(State(state), Json(body("eip155:84532", "0xbad")))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.error_reason.as_deref(), Some("invalid_signature"));
        assert!(!mock.settled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_network_is_not_found() {
        let (state, _) = state();
        let err = post_verify(State(state), Json(body("eip155:1", "0xgood")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (state, _) = state();
        let err = post_settle(State(state), Json(json!({ "paymentPayload": {} })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scheme_failure_is_server_error() {
        let (state, _) = state();
        let err = post_verify(State(state), Json(body("eip155:84532", "0xboom")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "rpc unavailable");
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(value) = health().await;
        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
