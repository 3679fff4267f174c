//! Error types for the t402 payment protocol.
//!
//! Verification and settlement outcomes are not errors; they travel as
//! [`VerifyResponse`](t402_proto::VerifyResponse) and
//! [`SettleResponse`](t402_proto::SettleResponse). The types here cover
//! configuration mistakes, routing misses and hook aborts.

use std::fmt;

use t402_proto::ProtocolError;

use crate::scheme::SchemeError;

/// Base error type for t402 payment operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// No registered scheme found for scheme/network combination.
    #[error("{0}")]
    SchemeNotFound(#[from] SchemeNotFoundError),

    /// No payment requirements match registered schemes.
    #[error("{0}")]
    NoMatchingRequirements(#[from] NoMatchingRequirementsError),

    /// Payment was aborted by a before hook.
    #[error("{0}")]
    Aborted(#[from] PaymentAbortedError),

    /// The request could not be decoded.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// A scheme implementation failed.
    #[error("{0}")]
    Scheme(SchemeError),
}

/// No registered scheme found for scheme/network combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeNotFoundError {
    /// The requested scheme.
    pub scheme: String,
    /// The requested network.
    pub network: String,
}

impl SchemeNotFoundError {
    /// Creates a new scheme-not-found error.
    #[must_use]
    pub fn new(scheme: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            network: network.into(),
        }
    }
}

impl fmt::Display for SchemeNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No scheme '{}' registered for network '{}'",
            self.scheme, self.network
        )
    }
}

impl std::error::Error for SchemeNotFoundError {}

/// No payment requirements match registered schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatchingRequirementsError {
    /// Reason for the error.
    pub reason: String,
}

impl NoMatchingRequirementsError {
    /// Creates a new no-matching-requirements error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for NoMatchingRequirementsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for NoMatchingRequirementsError {}

/// Payment was aborted by a before hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAbortedError {
    /// The reason for aborting.
    pub reason: String,
}

impl PaymentAbortedError {
    /// Creates a new payment-aborted error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PaymentAbortedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payment aborted: {}", self.reason)
    }
}

impl std::error::Error for PaymentAbortedError {}

/// Configuration errors raised while building requirements or payloads.
///
/// Each variant names the offending value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The network is not served by the scheme family.
    #[error("Unsupported {family} network: {network}")]
    UnsupportedNetwork {
        /// Family label (e.g. `"EVM"`, `"TON"`).
        family: &'static str,
        /// The rejected network.
        network: String,
    },

    /// The network could not be resolved at all.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// The price string is not a decimal number.
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// The price is below zero.
    #[error("Price must not be negative: {0}")]
    NegativePrice(String),

    /// The price does not fit the asset's atomic range.
    #[error("Price out of range: {0}")]
    PriceOverflow(String),

    /// An atomic amount is not a non-negative integer.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Errors raised by a [`SchemeRegistry`](crate::scheme::SchemeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The scheme reported an empty identifier.
    #[error("scheme registered under '{pattern}' has an empty name")]
    MissingSchemeName {
        /// Pattern the registration was attempted under.
        pattern: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ConfigError::UnsupportedNetwork {
            family: "TRON",
            network: "tron:moon".into(),
        };
        assert_eq!(err.to_string(), "Unsupported TRON network: tron:moon");
        assert_eq!(
            ConfigError::InvalidPrice("abc".into()).to_string(),
            "Invalid price format: abc"
        );
        assert_eq!(
            SchemeNotFoundError::new("exact", "ton:mainnet").to_string(),
            "No scheme 'exact' registered for network 'ton:mainnet'"
        );
    }
}
