//! Network-pattern scheme registry.
//!
//! Schemes are registered under `(version, networkPattern, schemeName)`.
//! A pattern is either an exact CAIP-2 identifier (`"eip155:8453"`) or a
//! wildcard (`"eip155:*"`, `"*"`). Lookups try the exact key first, then
//! wildcards in registration order, so an exact registration always shadows
//! a wildcard one.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use t402_proto::helpers::{caip_family, is_wildcard_pattern, matches_network_pattern};
use t402_proto::{SupportedKind, T402_VERSION, T402_VERSION_V1};

use super::{SchemeClient, SchemeFacilitator, SchemeId, SchemeServer};
use crate::error::RegistryError;

type ByName<T> = HashMap<String, Arc<T>>;

struct Entries<T: ?Sized> {
    schemes: HashMap<u32, HashMap<String, ByName<T>>>,
    patterns: HashMap<u32, Vec<String>>,
}

impl<T: ?Sized> Default for Entries<T> {
    fn default() -> Self {
        Self {
            schemes: HashMap::new(),
            patterns: HashMap::new(),
        }
    }
}

/// Thread-safe registry of scheme implementations.
///
/// Reads run in parallel; registration takes the write lock. Lookups clone
/// `Arc` handles out, so no lock is ever held by a caller. A poisoned lock
/// is recovered, since every mutation leaves the maps consistent.
pub struct SchemeRegistry<T: ?Sized> {
    entries: RwLock<Entries<T>>,
}

impl<T: ?Sized> Default for SchemeRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for SchemeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.read();
        let mut keys: Vec<String> = entries
            .schemes
            .iter()
            .flat_map(|(version, networks)| {
                networks.iter().flat_map(move |(pattern, names)| {
                    names.keys().map(move |name| format!("v{version}:{pattern}:{name}"))
                })
            })
            .collect();
        keys.sort_unstable();
        f.debug_tuple("SchemeRegistry").field(&keys).finish()
    }
}

impl<T: ?Sized> SchemeRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries<T>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries<T>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes every registration for `version`, or everything when `None`.
    pub fn clear(&self, version: Option<u32>) {
        let mut entries = self.write();
        match version {
            Some(v) => {
                entries.schemes.remove(&v);
                entries.patterns.remove(&v);
            }
            None => {
                entries.schemes.clear();
                entries.patterns.clear();
            }
        }
    }
}

impl<T: ?Sized + SchemeId> SchemeRegistry<T> {
    /// Registers a V2 scheme under a network pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingSchemeName`] if the scheme's name is
    /// empty.
    pub fn register(&self, pattern: impl Into<String>, scheme: Arc<T>) -> Result<(), RegistryError> {
        self.register_version(pattern, scheme, T402_VERSION)
    }

    /// Registers a V1 scheme under a network pattern.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_v1(
        &self,
        pattern: impl Into<String>,
        scheme: Arc<T>,
    ) -> Result<(), RegistryError> {
        self.register_version(pattern, scheme, T402_VERSION_V1)
    }

    /// Registers a scheme under a network pattern for a protocol version.
    ///
    /// Re-registering the same key replaces the previous scheme.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_version(
        &self,
        pattern: impl Into<String>,
        scheme: Arc<T>,
        version: u32,
    ) -> Result<(), RegistryError> {
        let pattern = pattern.into();
        let name = scheme.scheme().to_owned();
        if name.is_empty() {
            return Err(RegistryError::MissingSchemeName { pattern });
        }

        let mut entries = self.write();
        if is_wildcard_pattern(&pattern) {
            let patterns = entries.patterns.entry(version).or_default();
            if !patterns.contains(&pattern) {
                patterns.push(pattern.clone());
            }
        }
        tracing::debug!(%pattern, scheme = %name, version, "registered scheme");
        entries
            .schemes
            .entry(version)
            .or_default()
            .entry(pattern)
            .or_default()
            .insert(name, scheme);
        Ok(())
    }

    /// Finds the scheme for a concrete network.
    ///
    /// The exact key wins; otherwise the first wildcard pattern (in
    /// registration order) that matches and carries `scheme_name`.
    #[must_use]
    pub fn get(&self, network: &str, scheme_name: &str, version: u32) -> Option<Arc<T>> {
        let entries = self.read();
        let by_pattern = entries.schemes.get(&version)?;

        if let Some(found) = by_pattern.get(network).and_then(|m| m.get(scheme_name)) {
            return Some(Arc::clone(found));
        }

        entries
            .patterns
            .get(&version)?
            .iter()
            .filter(|p| matches_network_pattern(network, p))
            .find_map(|p| by_pattern.get(p).and_then(|m| m.get(scheme_name)))
            .map(Arc::clone)
    }

    /// Returns every scheme usable on `network`, keyed by scheme name.
    ///
    /// Exact registrations win over wildcard ones on a name collision, and
    /// earlier wildcards win over later ones.
    #[must_use]
    pub fn get_for_network(&self, network: &str, version: u32) -> HashMap<String, Arc<T>> {
        let entries = self.read();
        let mut found = HashMap::new();
        let Some(by_pattern) = entries.schemes.get(&version) else {
            return found;
        };

        if let Some(exact) = by_pattern.get(network) {
            for (name, scheme) in exact {
                found.insert(name.clone(), Arc::clone(scheme));
            }
        }
        for pattern in entries.patterns.get(&version).into_iter().flatten() {
            if !matches_network_pattern(network, pattern) {
                continue;
            }
            for (name, scheme) in by_pattern.get(pattern).into_iter().flatten() {
                found
                    .entry(name.clone())
                    .or_insert_with(|| Arc::clone(scheme));
            }
        }
        found
    }

    /// Returns `true` if [`get`](Self::get) would find a scheme.
    #[must_use]
    pub fn has_scheme(&self, network: &str, scheme_name: &str, version: u32) -> bool {
        self.get(network, scheme_name, version).is_some()
    }

    /// Lists registered network patterns, sorted.
    #[must_use]
    pub fn registered_networks(&self, version: u32) -> Vec<String> {
        let entries = self.read();
        let mut networks: Vec<String> = entries
            .schemes
            .get(&version)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        networks.sort_unstable();
        networks
    }

    /// Lists registered scheme names, sorted and deduplicated.
    #[must_use]
    pub fn registered_schemes(&self, version: u32) -> Vec<String> {
        let entries = self.read();
        let mut names: Vec<String> = entries
            .schemes
            .get(&version)
            .into_iter()
            .flat_map(HashMap::values)
            .flat_map(|m| m.keys().cloned())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl SchemeRegistry<dyn SchemeFacilitator> {
    /// Lists every non-wildcard registration as a [`SupportedKind`].
    ///
    /// Sorted by network, then scheme.
    #[must_use]
    pub fn get_supported_kinds(&self, version: u32) -> Vec<SupportedKind> {
        let entries = self.read();
        let mut kinds: Vec<SupportedKind> = entries
            .schemes
            .get(&version)
            .into_iter()
            .flatten()
            .filter(|(pattern, _)| !is_wildcard_pattern(pattern))
            .flat_map(|(network, names)| {
                names.iter().map(move |(name, scheme)| SupportedKind {
                    t402_version: version,
                    scheme: name.clone(),
                    network: network.clone(),
                    extra: scheme
                        .get_extra(network)
                        .filter(|extra| extra.as_object().is_none_or(|m| !m.is_empty())),
                })
            })
            .collect();
        kinds.sort_by(|a, b| (&a.network, &a.scheme).cmp(&(&b.network, &b.scheme)));
        kinds
    }

    /// Groups facilitator signer addresses by CAIP family (`"eip155:*"`).
    ///
    /// Each scheme is asked once per pattern it is registered under. The
    /// family is the namespace of that pattern; a legacy name without a
    /// namespace, or the bare `"*"`, falls back to the scheme's own family.
    /// Addresses are deduplicated and sorted.
    #[must_use]
    pub fn get_signers_by_family(&self, version: u32) -> HashMap<String, Vec<String>> {
        let entries = self.read();
        let mut by_family: HashMap<String, Vec<String>> = HashMap::new();

        for (pattern, names) in entries.schemes.get(&version).into_iter().flatten() {
            for scheme in names.values() {
                let family = if pattern.contains(':') {
                    caip_family(pattern)
                } else {
                    scheme.caip_family()
                };
                by_family
                    .entry(family)
                    .or_default()
                    .extend(scheme.get_signers(pattern));
            }
        }
        for signers in by_family.values_mut() {
            signers.sort_unstable();
            signers.dedup();
        }
        by_family
    }
}

/// One registry per protocol role.
///
/// Built once at startup and passed to the [`T402Client`](crate::client::T402Client),
/// [`T402ResourceServer`](crate::server::T402ResourceServer) and
/// [`T402Facilitator`](crate::facilitator::T402Facilitator) that need it.
#[derive(Debug, Clone, Default)]
pub struct RegistryContext {
    /// Client schemes.
    pub client: Arc<SchemeRegistry<dyn SchemeClient>>,
    /// Server schemes.
    pub server: Arc<SchemeRegistry<dyn SchemeServer>>,
    /// Facilitator schemes.
    pub facilitator: Arc<SchemeRegistry<dyn SchemeFacilitator>>,
}

impl RegistryContext {
    /// Creates a context with three empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{BoxFuture, SchemeError};
    use serde_json::{Value, json};
    use t402_proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};

    struct Named {
        namespace: &'static str,
        name: &'static str,
        signer: &'static str,
    }

    impl Named {
        fn arc(namespace: &'static str, name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                namespace,
                name,
                signer: "",
            })
        }
    }

    impl SchemeId for Named {
        fn namespace(&self) -> &str {
            self.namespace
        }
        fn scheme(&self) -> &str {
            self.name
        }
    }

    impl SchemeFacilitator for Named {
        fn get_extra(&self, network: &str) -> Option<Value> {
            (network == "ton:mainnet").then(|| json!({"symbol": "USDT"}))
        }

        fn get_signers(&self, _network: &str) -> Vec<String> {
            vec![self.signer.to_owned()]
        }

        fn verify<'a>(
            &'a self,
            _payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
            Box::pin(async { Ok(VerifyResponse::valid(self.signer)) })
        }

        fn settle<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
            Box::pin(async move { Ok(SettleResponse::error("unused", payload.network())) })
        }
    }

    #[test]
    fn exact_registration_shadows_wildcard() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        let wildcard = Named::arc("eip155", "exact");
        let exact = Named::arc("eip155", "exact");
        registry.register("eip155:*", Arc::clone(&wildcard)).unwrap();
        registry.register("eip155:8453", Arc::clone(&exact)).unwrap();

        let base = registry.get("eip155:8453", "exact", 2).unwrap();
        assert!(Arc::ptr_eq(&base, &exact));
        let polygon = registry.get("eip155:137", "exact", 2).unwrap();
        assert!(Arc::ptr_eq(&polygon, &wildcard));
    }

    #[test]
    fn wildcard_does_not_cross_families() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        registry.register("eip155:*", Named::arc("eip155", "exact")).unwrap();
        assert!(
            registry
                .get("solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp", "exact", 2)
                .is_none()
        );
    }

    #[test]
    fn ton_wildcard_serves_mainnet_and_testnet_only() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        registry.register("ton:*", Named::arc("ton", "exact")).unwrap();
        assert!(registry.has_scheme("ton:mainnet", "exact", 2));
        assert!(registry.has_scheme("ton:testnet", "exact", 2));
        assert!(registry.get("eip155:8453", "exact", 2).is_none());
        assert!(registry.get("ton:mainnet", "exact", 1).is_none());
    }

    #[test]
    fn first_matching_wildcard_wins() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        let first = Named::arc("tron", "exact");
        registry.register("tron:*", Arc::clone(&first)).unwrap();
        registry.register("*", Named::arc("any", "exact")).unwrap();
        registry.register("*", Named::arc("any", "upto")).unwrap();

        let found = registry.get("tron:mainnet", "exact", 2).unwrap();
        assert!(Arc::ptr_eq(&found, &first));
        assert!(registry.has_scheme("tron:mainnet", "upto", 2));

        let all = registry.get_for_network("tron:mainnet", 2);
        assert_eq!(all.len(), 2);
        assert!(Arc::ptr_eq(&all["exact"], &first));
    }

    #[test]
    fn empty_scheme_name_is_rejected() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        let err = registry.register("ton:*", Named::arc("ton", "")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::MissingSchemeName {
                pattern: "ton:*".into()
            }
        );
        assert!(registry.registered_networks(2).is_empty());
    }

    #[test]
    fn listing_and_clear() {
        let registry: SchemeRegistry<Named> = SchemeRegistry::new();
        registry.register("ton:mainnet", Named::arc("ton", "exact")).unwrap();
        registry.register_v1("ton-mainnet", Named::arc("ton", "exact")).unwrap();
        assert_eq!(registry.registered_networks(2), vec!["ton:mainnet"]);
        assert_eq!(registry.registered_schemes(1), vec!["exact"]);

        registry.clear(Some(1));
        assert!(registry.registered_networks(1).is_empty());
        assert_eq!(registry.registered_networks(2).len(), 1);
        registry.clear(None);
        assert!(registry.registered_networks(2).is_empty());
    }

    #[test]
    fn supported_kinds_skip_wildcards_and_dedupe_signers() {
        let registry: SchemeRegistry<dyn SchemeFacilitator> = SchemeRegistry::new();
        let shared: Arc<dyn SchemeFacilitator> = Arc::new(Named {
            namespace: "ton",
            name: "exact",
            signer: "EQfacilitator",
        });
        registry.register("ton:mainnet", Arc::clone(&shared)).unwrap();
        registry.register("ton:testnet", Arc::clone(&shared)).unwrap();
        registry.register("ton:*", shared).unwrap();

        let kinds = registry.get_supported_kinds(2);
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].network, "ton:mainnet");
        assert_eq!(kinds[0].extra, Some(json!({"symbol": "USDT"})));
        assert_eq!(kinds[1].extra, None);

        let signers = registry.get_signers_by_family(2);
        assert_eq!(signers["ton:*"], vec!["EQfacilitator"]);
    }

    /// Operates one wallet per concrete network.
    struct PerNetwork;

    impl SchemeId for PerNetwork {
        fn namespace(&self) -> &str {
            "tron"
        }
        fn scheme(&self) -> &str {
            "exact"
        }
    }

    impl SchemeFacilitator for PerNetwork {
        fn get_signers(&self, network: &str) -> Vec<String> {
            match network {
                "tron:mainnet" | "tron-mainnet" => vec!["TMain".to_owned()],
                "tron:nile" => vec!["TNile".to_owned()],
                _ => Vec::new(),
            }
        }

        fn verify<'a>(
            &'a self,
            _payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
            Box::pin(async { Ok(VerifyResponse::invalid("unused")) })
        }

        fn settle<'a>(
            &'a self,
            payload: &'a PaymentPayload,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
            Box::pin(async move { Ok(SettleResponse::error("unused", payload.network())) })
        }
    }

    #[test]
    fn shared_instance_is_asked_for_every_network() {
        let registry: SchemeRegistry<dyn SchemeFacilitator> = SchemeRegistry::new();
        let shared: Arc<dyn SchemeFacilitator> = Arc::new(PerNetwork);
        registry.register("tron:mainnet", Arc::clone(&shared)).unwrap();
        registry.register("tron:nile", Arc::clone(&shared)).unwrap();
        registry.register_v1("tron-mainnet", shared).unwrap();

        let signers = registry.get_signers_by_family(2);
        assert_eq!(signers["tron:*"], vec!["TMain", "TNile"]);

        // Legacy names carry no namespace; the scheme supplies the family.
        let legacy = registry.get_signers_by_family(1);
        assert_eq!(legacy["tron:*"], vec!["TMain"]);
        assert!(!legacy.contains_key("tron-mainnet:*"));
    }
}
