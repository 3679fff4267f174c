//! HTTP-specific constants for the t402 protocol.

/// V2 payment payload (client to server).
pub const PAYMENT_SIGNATURE_HEADER: &str = "PAYMENT-SIGNATURE";

/// V2 payment requirements on a 402 response (server to client).
pub const PAYMENT_REQUIRED_HEADER: &str = "PAYMENT-REQUIRED";

/// V2 settlement result (server to client).
pub const PAYMENT_RESPONSE_HEADER: &str = "PAYMENT-RESPONSE";

/// V1 payment payload.
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// V1 settlement result.
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Headers a browser client must be allowed to read.
pub const EXPOSED_PAYMENT_HEADERS: &[&str] = &[
    PAYMENT_REQUIRED_HEADER,
    PAYMENT_RESPONSE_HEADER,
    X_PAYMENT_RESPONSE_HEADER,
];

/// HTTP 402 Payment Required.
pub const HTTP_STATUS_PAYMENT_REQUIRED: u16 = 402;

/// Public t402 facilitator.
pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.t402.io";
