//! Facilitator server configuration.
//!
//! Configuration is a JSON file. Secrets may be written as `$VAR` or
//! `${VAR}` and are resolved from the environment while parsing, so keys
//! never need to live in the file itself.
//!
//! ```json
//! {
//!   "host": "0.0.0.0",
//!   "port": 8080,
//!   "eip155": {
//!     "eip155:8453": { "rpc": "https://mainnet.base.org", "signers": ["$EVM_PRIVATE_KEY"] }
//!   },
//!   "solana": {
//!     "solana-devnet": { "rpc": "https://api.devnet.solana.com", "signers": ["${SOLANA_KEY}"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "t402-facilitator")]
#[command(about = "t402 facilitator HTTP server")]
pub struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    pub config: PathBuf,
    /// Overrides the bind address.
    #[arg(long, env = "HOST")]
    pub host: Option<IpAddr>,
    /// Overrides the port.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        /// File path.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON.
    #[error("failed to parse {}: {}", .path.display(), .source)]
    Parse {
        /// File path.
        path: PathBuf,
        /// Decode error, including unresolved `$VAR` references.
        #[source]
        source: serde_json::Error,
    },
}

/// A value given literally or as a `$VAR` / `${VAR}` environment reference.
#[derive(Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    /// Wraps a literal value.
    pub const fn from_literal(value: T) -> Self {
        Self(value)
    }

    /// Unwraps the resolved value.
    pub fn into_inner(self) -> T {
        self.0
    }

    fn env_var_name(raw: &str) -> Option<&str> {
        if let Some(braced) = raw.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            return Some(braced);
        }
        raw.strip_prefix('$').filter(|name| {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::fmt::Debug for LiteralOrEnv<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LiteralOrEnv(..)")
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let value = match Self::env_var_name(&raw) {
            Some(name) => std::env::var(name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{name}' not found (referenced as '{raw}')"
                ))
            })?,
            None => raw,
        };
        value
            .parse()
            .map(Self)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {e}")))
    }
}

/// One chain the facilitator settles on.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "K: FromStr, K::Err: std::fmt::Display")
)]
pub struct ChainConfig<K> {
    /// JSON-RPC endpoint.
    pub rpc: LiteralOrEnv<Url>,
    /// Settlement / fee-payer keys; the first is preferred.
    pub signers: Vec<LiteralOrEnv<K>>,
    /// Seconds to wait for inclusion after broadcasting.
    #[serde(default)]
    pub confirm_timeout_secs: Option<u64>,
}

const fn default_port() -> u16 {
    8080
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitatorConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// EVM chains keyed by CAIP-2 identifier or legacy name.
    #[cfg(feature = "chain-eip155")]
    #[serde(default)]
    pub eip155: BTreeMap<String, ChainConfig<alloy_signer_local::PrivateKeySigner>>,
    /// EVM scheme tunables.
    #[cfg(feature = "chain-eip155")]
    #[serde(default)]
    pub exact_evm: t402_evm::exact::ExactEvmConfig,
    /// Solana clusters keyed by CAIP-2 identifier or legacy name.
    #[cfg(feature = "chain-solana")]
    #[serde(default)]
    pub solana: BTreeMap<String, ChainConfig<SolanaKeypair>>,
    /// Solana scheme tunables.
    #[cfg(feature = "chain-solana")]
    #[serde(default)]
    pub exact_svm: t402_svm::exact::ExactSvmConfig,
    /// Extension names to advertise in `/supported`.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            #[cfg(feature = "chain-eip155")]
            eip155: BTreeMap::new(),
            #[cfg(feature = "chain-eip155")]
            exact_evm: t402_evm::exact::ExactEvmConfig::default(),
            #[cfg(feature = "chain-solana")]
            solana: BTreeMap::new(),
            #[cfg(feature = "chain-solana")]
            exact_svm: t402_svm::exact::ExactSvmConfig::default(),
            extensions: Vec::new(),
        }
    }
}

impl FacilitatorConfig {
    /// Loads the file named on the command line and applies overrides.
    ///
    /// # Errors
    ///
    /// See [`load_from`](Self::load_from).
    pub fn load(args: &CliArgs) -> Result<Self, ConfigLoadError> {
        let mut config = Self::load_from(&args.config)?;
        if let Some(host) = args.host {
            config.host = host;
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        Ok(config)
    }

    /// Loads `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] if the file cannot be read or parsed, or
    /// if a referenced environment variable is unset.
    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigLoadError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Parses configuration JSON.
    ///
    /// # Errors
    ///
    /// Returns the decode error.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of configured chains across all families.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        #[allow(unused_mut)]
        let mut count = 0;
        #[cfg(feature = "chain-eip155")]
        {
            count += self.eip155.len();
        }
        #[cfg(feature = "chain-solana")]
        {
            count += self.solana.len();
        }
        count
    }
}

/// A Solana keypair given as base58 or as a JSON byte array.
#[cfg(feature = "chain-solana")]
pub struct SolanaKeypair(solana_keypair::Keypair);

#[cfg(feature = "chain-solana")]
impl SolanaKeypair {
    /// Unwraps the keypair.
    #[must_use]
    pub fn into_inner(self) -> solana_keypair::Keypair {
        self.0
    }
}

#[cfg(feature = "chain-solana")]
impl Clone for SolanaKeypair {
    fn clone(&self) -> Self {
        Self(self.0.insecure_clone())
    }
}

#[cfg(feature = "chain-solana")]
impl std::fmt::Debug for SolanaKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use solana_signer::Signer;
        f.debug_tuple("SolanaKeypair").field(&self.0.pubkey()).finish()
    }
}

#[cfg(feature = "chain-solana")]
impl FromStr for SolanaKeypair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes: Vec<u8> = if s.starts_with('[') {
            serde_json::from_str(s).map_err(|e| format!("invalid keypair byte array: {e}"))?
        } else {
            bs58::decode(s)
                .into_vec()
                .map_err(|e| format!("invalid base58 keypair: {e}"))?
        };
        solana_keypair::Keypair::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|e| format!("invalid keypair: {e}"))
    }
}
