//! Client-side signing for the EVM `exact` scheme.
//!
//! [`ExactEvmClient`] produces ERC-3009 `transferWithAuthorization`
//! authorizations signed over EIP-712 typed data.

use alloy_primitives::{Address, B256, FixedBytes, Signature, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolStruct;
use rand::RngExt;
use rand::rng;
use serde_json::Value;
use t402::proto::PaymentRequirements;
use t402::scheme::{BoxFuture, SchemeClient, SchemeError, SchemeId};
use t402::timestamp::UnixTimestamp;

use super::error::ClientError;
use super::types::{ExactEvmAuthorization, ExactEvmExtra, ExactEvmPayload};
use super::{EVM_NAMESPACE, SCHEME_EXACT};
use crate::networks::chain_id;

/// Seconds subtracted from `now` for `validAfter`, absorbing clock skew.
const VALID_AFTER_SKEW_SECS: u64 = 60;

/// Signing capability the EVM client needs.
pub trait ClientEvmSigner: Send + Sync {
    /// The payer address.
    fn address(&self) -> Address;

    /// Signs a 32-byte prehash.
    fn sign_hash<'a>(
        &'a self,
        hash: &'a B256,
    ) -> BoxFuture<'a, Result<Signature, alloy_signer::Error>>;
}

impl ClientEvmSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    fn sign_hash<'a>(
        &'a self,
        hash: &'a B256,
    ) -> BoxFuture<'a, Result<Signature, alloy_signer::Error>> {
        Box::pin(alloy_signer::Signer::sign_hash(self, hash))
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ClientError> {
    value.parse().map_err(|_| ClientError::InvalidAddress {
        field,
        value: value.to_owned(),
    })
}

/// Client for the EVM `exact` scheme.
#[derive(Debug)]
pub struct ExactEvmClient<S> {
    signer: S,
}

impl<S: ClientEvmSigner> ExactEvmClient<S> {
    /// Creates a client signing with `signer`.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }

    /// Returns the payer address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Builds and signs the authorization for `requirements`.
    ///
    /// # Errors
    ///
    /// Fails on missing or malformed fields, an unknown network, or a
    /// signer error.
    pub async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactEvmPayload, ClientError> {
        if requirements.asset.is_empty() {
            return Err(ClientError::MissingField("Asset (ERC-20 contract address)"));
        }
        if requirements.pay_to.is_empty() {
            return Err(ClientError::MissingField("PayTo address"));
        }
        if requirements.amount.is_empty() {
            return Err(ClientError::MissingField("Amount"));
        }
        let asset = parse_address("asset", &requirements.asset)?;
        let pay_to = parse_address("payTo", &requirements.pay_to)?;
        let value = U256::from_str_radix(&requirements.amount, 10)
            .map_err(|_| ClientError::InvalidAmount(requirements.amount.clone()))?;
        let chain_id = chain_id(&requirements.network)
            .ok_or_else(|| ClientError::UnknownNetwork(requirements.network.clone()))?;

        let now = UnixTimestamp::now();
        let nonce: [u8; 32] = rng().random();
        let authorization = ExactEvmAuthorization {
            from: self.signer.address(),
            to: pay_to,
            value,
            valid_after: now.saturating_sub(VALID_AFTER_SKEW_SECS),
            valid_before: now + requirements.max_timeout_seconds,
            nonce: FixedBytes(nonce),
        };

        let domain = ExactEvmExtra::from_requirements(requirements).domain(chain_id, asset);
        let hash = authorization.message().eip712_signing_hash(&domain);
        let signature = self.signer.sign_hash(&hash).await?;

        tracing::debug!(
            network = %requirements.network,
            payer = %authorization.from,
            "signed transferWithAuthorization"
        );

        Ok(ExactEvmPayload {
            signature: signature.as_bytes().into(),
            authorization,
        })
    }
}

impl<S> SchemeId for ExactEvmClient<S> {
    fn namespace(&self) -> &str {
        EVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: ClientEvmSigner> SchemeClient for ExactEvmClient<S> {
    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let payload = self.sign_payment(requirements).await?;
            Ok(serde_json::to_value(payload)?)
        })
    }
}
