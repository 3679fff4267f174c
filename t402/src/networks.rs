//! Legacy network name tables.
//!
//! V1 payloads name networks with plain strings (`"base"`, `"solana-devnet"`,
//! `"ton-mainnet"`). Each family crate publishes a `&[NetworkInfo]` table
//! mapping those names to CAIP-2 identifiers; [`normalize_network`] applies
//! one.

use std::borrow::Cow;
use std::collections::HashMap;

/// A known network definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Legacy human-readable name (e.g. `"base-sepolia"`).
    pub name: &'static str,
    /// CAIP-2 namespace (e.g. `"eip155"`).
    pub namespace: &'static str,
    /// Chain reference (e.g. `"84532"`).
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Returns the CAIP-2 identifier.
    #[must_use]
    pub fn caip2(&self) -> String {
        format!("{}:{}", self.namespace, self.reference)
    }
}

/// Resolves a network to its CAIP-2 form using a legacy-name table.
///
/// Anything already containing `:` is returned unchanged; unknown names
/// yield `None`.
#[must_use]
pub fn normalize_network<'a>(table: &[NetworkInfo], network: &'a str) -> Option<Cow<'a, str>> {
    if network.contains(':') {
        return Some(Cow::Borrowed(network));
    }
    table
        .iter()
        .find(|info| info.name == network)
        .map(|info| Cow::Owned(info.caip2()))
}

/// Bidirectional map between legacy names and CAIP-2 identifiers.
///
/// Built from the tables that family crates export.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    name_to_caip2: HashMap<&'static str, String>,
    caip2_to_name: HashMap<String, &'static str>,
}

impl NetworkRegistry {
    /// Creates a registry pre-populated from a network table.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self::default();
        registry.register(networks);
        registry
    }

    /// Registers additional networks. The first name seen for a CAIP-2
    /// identifier is kept as its canonical legacy name.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            let caip2 = info.caip2();
            self.caip2_to_name.entry(caip2.clone()).or_insert(info.name);
            self.name_to_caip2.insert(info.name, caip2);
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Looks up a CAIP-2 identifier by legacy name.
    #[must_use]
    pub fn caip2_by_name(&self, name: &str) -> Option<&str> {
        self.name_to_caip2.get(name).map(String::as_str)
    }

    /// Looks up the legacy name of a CAIP-2 identifier.
    #[must_use]
    pub fn name_by_caip2(&self, caip2: &str) -> Option<&'static str> {
        self.caip2_to_name.get(caip2).copied()
    }

    /// Returns the number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.name_to_caip2.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_to_caip2.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[NetworkInfo] = &[
        NetworkInfo {
            name: "mainnet",
            namespace: "ton",
            reference: "mainnet",
        },
        NetworkInfo {
            name: "ton-mainnet",
            namespace: "ton",
            reference: "mainnet",
        },
    ];

    #[test]
    fn legacy_aliases_resolve() {
        assert_eq!(normalize_network(TABLE, "ton-mainnet").unwrap(), "ton:mainnet");
        assert_eq!(normalize_network(TABLE, "ton:testnet").unwrap(), "ton:testnet");
        assert!(normalize_network(TABLE, "ton-devnet").is_none());
    }

    #[test]
    fn registry_keeps_first_name() {
        let registry = NetworkRegistry::from_networks(TABLE);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.caip2_by_name("mainnet"), Some("ton:mainnet"));
        assert_eq!(registry.name_by_caip2("ton:mainnet"), Some("mainnet"));
    }
}
