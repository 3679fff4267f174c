//! HTTP error mapping for the facilitator endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use t402::error::PaymentError;

/// A request the facilitator could not route or decode.
///
/// Invalid payments are not errors: they are answered with `200 OK` and an
/// `isValid: false` or `success: false` body.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct FacilitatorError(#[from] PaymentError);

impl FacilitatorError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            PaymentError::SchemeNotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::Protocol(_) | PaymentError::NoMatchingRequirements(_) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Aborted(_) | PaymentError::Scheme(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FacilitatorError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "facilitator request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
