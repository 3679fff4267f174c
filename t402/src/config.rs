//! Configuration for protected resources.

use serde::{Deserialize, Serialize};
use t402_proto::Network;

use crate::amount::Price;

/// Payment window used when a resource does not set one.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// Configuration for a protected resource.
///
/// Defines what a resource server charges for a specific endpoint.
///
/// # Example
///
/// ```rust
/// use t402::config::ResourceConfig;
///
/// let config = ResourceConfig {
///     scheme: "exact".into(),
///     pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".into(),
///     price: "$0.10".into(),
///     network: "eip155:8453".into(),
///     max_timeout_seconds: None,
/// };
/// assert_eq!(config.max_timeout_seconds(), 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Payment scheme identifier (e.g., `"exact"`).
    pub scheme: String,

    /// Recipient address.
    pub pay_to: String,

    /// Price for the resource.
    pub price: Price,

    /// CAIP-2 network identifier (e.g., `"eip155:8453"`).
    pub network: Network,

    /// Maximum time in seconds for payment validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
}

impl ResourceConfig {
    /// Returns the payment window, falling back to
    /// [`DEFAULT_MAX_TIMEOUT_SECONDS`].
    #[must_use]
    pub fn max_timeout_seconds(&self) -> u64 {
        self.max_timeout_seconds
            .unwrap_or(DEFAULT_MAX_TIMEOUT_SECONDS)
    }
}
