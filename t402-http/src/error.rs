//! Error types for the HTTP header codec.

use t402::proto::ProtocolError;

/// Errors raised while encoding or decoding t402 headers.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The header value is not strict standard base64.
    #[error("Invalid payment header: not valid base64")]
    InvalidBase64,

    /// The decoded bytes are not the expected JSON document.
    #[error("Invalid payment header: invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    /// A message could not be serialized.
    #[error("failed to serialize header value: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The JSON parsed but is not a valid t402 message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
