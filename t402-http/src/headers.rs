//! Base64 header codec for t402 protocol messages.
//!
//! Header values are standard base64 (with padding) over compact JSON.
//! Decoding validates the alphabet and length before touching the bytes, so
//! URL-safe or unpadded input is rejected rather than silently accepted.

use std::sync::LazyLock;

use base64::prelude::*;
use http::HeaderMap;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use t402::proto::helpers::{
    PaymentPayloadEnum, PaymentRequiredEnum, parse_payment_payload, parse_payment_required,
};
use t402::proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentResponse, T402_VERSION,
    T402_VERSION_V1,
};

use crate::constants::{
    PAYMENT_RESPONSE_HEADER, PAYMENT_SIGNATURE_HEADER, X_PAYMENT_HEADER,
    X_PAYMENT_RESPONSE_HEADER,
};
use crate::error::HttpError;

static BASE64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").expect("valid base64 regex"));

/// Returns `true` if `value` is non-empty, padded, standard-alphabet base64.
#[must_use]
pub fn is_valid_base64(value: &str) -> bool {
    !value.is_empty() && value.len() % 4 == 0 && BASE64_RE.is_match(value)
}

fn encode<T: Serialize + ?Sized>(message: &T) -> Result<String, HttpError> {
    let json = serde_json::to_vec(message).map_err(HttpError::Serialize)?;
    Ok(BASE64_STANDARD.encode(json))
}

fn decode<T: DeserializeOwned>(header_value: &str) -> Result<T, HttpError> {
    let trimmed = header_value.trim();
    if !is_valid_base64(trimmed) {
        return Err(HttpError::InvalidBase64);
    }
    let bytes = BASE64_STANDARD
        .decode(trimmed)
        .map_err(|_| HttpError::InvalidBase64)?;
    serde_json::from_slice(&bytes).map_err(HttpError::InvalidJson)
}

/// Encodes a V2 payload for the `PAYMENT-SIGNATURE` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if serialization fails.
pub fn encode_payment_signature(payload: &PaymentPayload) -> Result<String, HttpError> {
    encode(payload)
}

/// Encodes a V1 payload for the `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if serialization fails.
pub fn encode_x_payment(payload: &PaymentPayloadV1) -> Result<String, HttpError> {
    encode(payload)
}

/// Decodes a `PAYMENT-SIGNATURE` or `X-PAYMENT` value into a version-tagged
/// payload.
///
/// # Errors
///
/// Returns [`HttpError::InvalidBase64`], [`HttpError::InvalidJson`], or
/// [`HttpError::Protocol`] when the JSON is not a payment payload.
pub fn decode_payment_payload(header_value: &str) -> Result<PaymentPayloadEnum, HttpError> {
    let value: Value = decode(header_value)?;
    Ok(parse_payment_payload(&value)?)
}

/// Encodes a 402 body for the `PAYMENT-REQUIRED` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if serialization fails.
pub fn encode_payment_required(required: &PaymentRequired) -> Result<String, HttpError> {
    encode(required)
}

/// Decodes a `PAYMENT-REQUIRED` value.
///
/// # Errors
///
/// Returns [`HttpError`] on base64, JSON, or version errors.
pub fn decode_payment_required(header_value: &str) -> Result<PaymentRequiredEnum, HttpError> {
    let value: Value = decode(header_value)?;
    Ok(parse_payment_required(&value)?)
}

/// Encodes a settlement result for `PAYMENT-RESPONSE` / `X-PAYMENT-RESPONSE`.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if serialization fails.
pub fn encode_payment_response(response: &PaymentResponse) -> Result<String, HttpError> {
    encode(response)
}

/// Decodes a `PAYMENT-RESPONSE` value.
///
/// # Errors
///
/// Returns [`HttpError::InvalidBase64`] or [`HttpError::InvalidJson`].
pub fn decode_payment_response(header_value: &str) -> Result<PaymentResponse, HttpError> {
    decode(header_value)
}

/// Detects the protocol version of a request from its payment header.
///
/// `PAYMENT-SIGNATURE` means V2 and `X-PAYMENT` means V1; V2 wins when both
/// are present. Returns `None` when the request carries no payment.
#[must_use]
pub fn detect_version(headers: &HeaderMap) -> Option<u32> {
    if headers.contains_key(PAYMENT_SIGNATURE_HEADER) {
        Some(T402_VERSION)
    } else if headers.contains_key(X_PAYMENT_HEADER) {
        Some(T402_VERSION_V1)
    } else {
        None
    }
}

/// Returns the detected version together with the raw payment header value.
#[must_use]
pub fn extract_payment(headers: &HeaderMap) -> Option<(u32, &str)> {
    let version = detect_version(headers)?;
    let value = headers
        .get(payment_header_name(version))?
        .to_str()
        .ok()?;
    Some((version, value))
}

/// Request header carrying the payment for `version`.
#[must_use]
pub const fn payment_header_name(version: u32) -> &'static str {
    if version == T402_VERSION_V1 {
        X_PAYMENT_HEADER
    } else {
        PAYMENT_SIGNATURE_HEADER
    }
}

/// Response header carrying the settlement result for `version`.
#[must_use]
pub const fn payment_response_header_name(version: u32) -> &'static str {
    if version == T402_VERSION_V1 {
        X_PAYMENT_RESPONSE_HEADER
    } else {
        PAYMENT_RESPONSE_HEADER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;
    use t402::proto::SettleResponse;

    fn payload() -> PaymentPayload {
        serde_json::from_value(json!({
            "t402Version": 2,
            "payload": { "signature": "0xabc" },
            "accepted": {
                "scheme": "exact",
                "network": "eip155:8453",
                "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "amount": "1000000",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "maxTimeoutSeconds": 300
            }
        }))
        .unwrap()
    }

    #[test]
    fn payment_signature_round_trip() {
        let original = payload();
        let header = encode_payment_signature(&original).unwrap();
        assert!(is_valid_base64(&header));
        match decode_payment_payload(&header).unwrap() {
            PaymentPayloadEnum::V2(decoded) => assert_eq!(*decoded, original),
            PaymentPayloadEnum::V1(_) => panic!("expected a V2 payload"),
        }
    }

    #[test]
    fn v1_payload_is_tagged_v1() {
        let v1 = PaymentPayloadV1 {
            t402_version: 1,
            scheme: "exact".into(),
            network: "base".into(),
            payload: json!({}),
        };
        let decoded = decode_payment_payload(&encode_x_payment(&v1).unwrap()).unwrap();
        assert_eq!(decoded.version(), 1);
        assert_eq!(decoded.network(), "base");
    }

    #[test]
    fn rejects_non_base64() {
        for bad in ["", "abc", "not base64!!", "ab-_ab-_", "YWJj\u{0}"] {
            assert!(
                matches!(decode_payment_payload(bad), Err(HttpError::InvalidBase64)),
                "{bad:?}"
            );
        }
        assert_eq!(
            HttpError::InvalidBase64.to_string(),
            "Invalid payment header: not valid base64"
        );
    }

    #[test]
    fn rejects_non_json() {
        let header = BASE64_STANDARD.encode("nope");
        let err = decode_payment_payload(&header).unwrap_err();
        assert!(matches!(err, HttpError::InvalidJson(_)));
        assert_eq!(err.to_string(), "Invalid payment header: invalid JSON");
    }

    #[test]
    fn json_without_version_is_a_protocol_error() {
        let header = BASE64_STANDARD.encode(r#"{"payload":{}}"#);
        assert!(matches!(
            decode_payment_payload(&header),
            Err(HttpError::Protocol(_))
        ));
    }

    #[test]
    fn payment_response_round_trip() {
        let settle = SettleResponse::success("0xdead", "eip155:8453", "0xpayer");
        let response = PaymentResponse::from_settle(settle, None);
        let decoded = decode_payment_response(&encode_payment_response(&response).unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn version_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(detect_version(&headers), None);
        assert!(extract_payment(&headers).is_none());

        headers.insert("x-payment", HeaderValue::from_static("djE="));
        assert_eq!(detect_version(&headers), Some(1));
        assert_eq!(extract_payment(&headers), Some((1, "djE=")));

        headers.insert("payment-signature", HeaderValue::from_static("djI="));
        assert_eq!(detect_version(&headers), Some(2));
        assert_eq!(extract_payment(&headers), Some((2, "djI=")));

        assert_eq!(payment_response_header_name(1), "X-PAYMENT-RESPONSE");
        assert_eq!(payment_response_header_name(2), "PAYMENT-RESPONSE");
    }
}
