//! Builds the facilitator scheme registry from configuration.

use std::sync::Arc;

use t402::error::RegistryError;
use t402::facilitator::T402Facilitator;
use t402::scheme::{SchemeFacilitator, SchemeRegistry};

use crate::config::FacilitatorConfig;

/// Errors raised while wiring chains into the registry.
#[derive(Debug, thiserror::Error)]
pub enum SchemeBuildError {
    /// A chain key is not a network of its family.
    #[error("unknown {family} network in config: {network}")]
    UnknownNetwork {
        /// Config section.
        family: &'static str,
        /// Offending key.
        network: String,
    },
    /// A chain lists no signer.
    #[error("no signer configured for {0}")]
    NoSigner(String),
    /// The EVM provider could not be created.
    #[cfg(feature = "chain-eip155")]
    #[error("{network}: {source}")]
    Evm {
        /// Network being configured.
        network: String,
        /// Provider error.
        #[source]
        source: t402_evm::exact::EvmFacilitatorError,
    },
    /// The registry refused the scheme.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registers one `exact` facilitator per configured chain.
///
/// # Errors
///
/// Returns [`SchemeBuildError`] on an unknown network key, a chain
/// without signers, or a provider construction failure.
pub fn build_facilitator(config: FacilitatorConfig) -> Result<T402Facilitator, SchemeBuildError> {
    let registry: Arc<SchemeRegistry<dyn SchemeFacilitator>> = Arc::new(SchemeRegistry::new());

    #[cfg(feature = "chain-eip155")]
    register_evm(&registry, &config)?;
    #[cfg(feature = "chain-solana")]
    register_svm(&registry, &config)?;

    let mut facilitator = T402Facilitator::new(registry);
    for extension in config.extensions {
        facilitator.register_extension(extension);
    }
    Ok(facilitator)
}

#[cfg(feature = "chain-eip155")]
fn register_evm(
    registry: &SchemeRegistry<dyn SchemeFacilitator>,
    config: &FacilitatorConfig,
) -> Result<(), SchemeBuildError> {
    use t402_evm::exact::ExactEvmFacilitator;
    use t402_evm::networks::caip2;
    use t402_evm::provider::EvmProvider;

    for (key, chain) in &config.eip155 {
        let network = t402_evm::chain_id(key)
            .map(caip2)
            .ok_or_else(|| SchemeBuildError::UnknownNetwork {
                family: "eip155",
                network: key.clone(),
            })?;
        if chain.signers.is_empty() {
            return Err(SchemeBuildError::NoSigner(network));
        }
        let signers = chain
            .signers
            .iter()
            .map(|signer| (**signer).clone())
            .collect();
        let mut provider = EvmProvider::new((*chain.rpc).clone(), signers).map_err(|source| {
            SchemeBuildError::Evm {
                network: network.clone(),
                source,
            }
        })?;
        if let Some(secs) = chain.confirm_timeout_secs {
            provider = provider.with_receipt_timeout(std::time::Duration::from_secs(secs));
        }
        registry.register(
            network.clone(),
            Arc::new(ExactEvmFacilitator::with_config(provider, config.exact_evm)),
        )?;
        tracing::info!(%network, signers = chain.signers.len(), "registered evm exact scheme");
    }
    Ok(())
}

#[cfg(feature = "chain-solana")]
fn register_svm(
    registry: &SchemeRegistry<dyn SchemeFacilitator>,
    config: &FacilitatorConfig,
) -> Result<(), SchemeBuildError> {
    use t402_svm::exact::ExactSvmFacilitator;
    use t402_svm::networks::normalize;
    use t402_svm::rpc::SvmRpc;

    for (key, chain) in &config.solana {
        let network = normalize(key).ok_or_else(|| SchemeBuildError::UnknownNetwork {
            family: "solana",
            network: key.clone(),
        })?;
        if chain.signers.is_empty() {
            return Err(SchemeBuildError::NoSigner(network));
        }
        let keypairs = chain
            .signers
            .iter()
            .map(|keypair| (**keypair).clone().into_inner())
            .collect();
        let mut rpc = SvmRpc::new(chain.rpc.as_str(), keypairs);
        if let Some(secs) = chain.confirm_timeout_secs {
            rpc = rpc.with_confirm_timeout(std::time::Duration::from_secs(secs));
        }
        registry.register(
            network.clone(),
            Arc::new(ExactSvmFacilitator::with_config(rpc, config.exact_svm.clone())),
        )?;
        tracing::info!(%network, fee_payers = chain.signers.len(), "registered solana exact scheme");
    }
    Ok(())
}
