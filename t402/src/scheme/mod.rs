//! Payment scheme system for t402.
//!
//! A scheme defines how one kind of payment is authorized, priced, verified
//! and settled on one blockchain family. Three object-safe traits cover the
//! three roles:
//!
//! - [`SchemeClient`] - builds and signs the scheme payload
//! - [`SchemeServer`] - converts prices and enriches requirements
//! - [`SchemeFacilitator`] - verifies and settles payloads
//!
//! Implementations are stored in a [`SchemeRegistry`] keyed by protocol
//! version, network pattern and scheme name. [`RegistryContext`] bundles one
//! registry per role.

mod client;
mod facilitator;
mod registry;
mod server;

pub use client::*;
pub use facilitator::*;
pub use registry::*;
pub use server::*;

pub use futures_util::future::BoxFuture;

/// Boxed error returned across scheme trait boundaries.
pub type SchemeError = Box<dyn std::error::Error + Send + Sync>;

/// A unit struct representing the string literal `"exact"`.
///
/// This is the canonical scheme name for exact-amount payment schemes
/// across all chain families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactScheme;

impl ExactScheme {
    /// The string literal value: `"exact"`.
    pub const VALUE: &'static str = "exact";
}

impl std::fmt::Display for ExactScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VALUE)
    }
}

impl AsRef<str> for ExactScheme {
    fn as_ref(&self) -> &str {
        Self::VALUE
    }
}

impl std::str::FromStr for ExactScheme {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::VALUE {
            Ok(Self)
        } else {
            Err(format!("expected '{}', got '{s}'", Self::VALUE))
        }
    }
}

impl serde::Serialize for ExactScheme {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(Self::VALUE)
    }
}

impl<'de> serde::Deserialize<'de> for ExactScheme {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies a payment scheme.
///
/// Each scheme has an identifier composed of the chain namespace and the
/// scheme name.
pub trait SchemeId {
    /// Returns the chain namespace (e.g., "eip155", "ton").
    fn namespace(&self) -> &str;

    /// Returns the scheme name (e.g., "exact").
    fn scheme(&self) -> &str;

    /// Returns the CAIP-2 family pattern this scheme serves.
    ///
    /// Used to group signers in the supported response. EVM schemes
    /// return `"eip155:*"`, TRON schemes `"tron:*"`.
    fn caip_family(&self) -> String {
        format!("{}:*", self.namespace())
    }

    /// Returns the full scheme identifier (e.g., "eip155-exact").
    fn id(&self) -> String {
        format!("{}-{}", self.namespace(), self.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TronExact;

    impl SchemeId for TronExact {
        fn namespace(&self) -> &str {
            "tron"
        }
        fn scheme(&self) -> &str {
            ExactScheme::VALUE
        }
    }

    #[test]
    fn scheme_id_defaults() {
        assert_eq!(TronExact.caip_family(), "tron:*");
        assert_eq!(TronExact.id(), "tron-exact");
    }

    #[test]
    fn exact_scheme_serde() {
        assert_eq!(serde_json::to_string(&ExactScheme).unwrap(), "\"exact\"");
        assert!(serde_json::from_str::<ExactScheme>("\"upto\"").is_err());
    }
}
