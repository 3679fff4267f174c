//! Facilitator-side verification and settlement for the EVM `exact` scheme.
//!
//! The signature is recovered locally from the EIP-712 hash; only the
//! nonce state, the payer balance and settlement itself touch the chain,
//! through an injected [`FacilitatorEvmSigner`].

use alloy_primitives::{Address, B256, Signature, U256};
use alloy_sol_types::SolStruct;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use t402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use t402::scheme::{BoxFuture, SchemeError, SchemeFacilitator, SchemeId};
use t402::timestamp::UnixTimestamp;

use super::error::EvmFacilitatorError;
use super::types::{ExactEvmExtra, ExactEvmPayload};
use super::{EVM_NAMESPACE, SCHEME_EXACT};
use crate::networks::chain_id;

/// Outcome of a mined settlement transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Transaction hash.
    pub hash: B256,
    /// Whether execution succeeded.
    pub success: bool,
}

/// Chain access the EVM facilitator needs.
pub trait FacilitatorEvmSigner: Send + Sync {
    /// Addresses that submit settlement transactions.
    fn addresses(&self) -> Vec<Address>;

    /// ERC-20 balance of `account`.
    fn balance_of(
        &self,
        token: Address,
        account: Address,
    ) -> BoxFuture<'_, Result<U256, EvmFacilitatorError>>;

    /// Whether an ERC-3009 nonce has already been consumed.
    fn authorization_state(
        &self,
        token: Address,
        authorizer: Address,
        nonce: B256,
    ) -> BoxFuture<'_, Result<bool, EvmFacilitatorError>>;

    /// Submits `transferWithAuthorization` and returns the transaction hash.
    fn transfer_with_authorization<'a>(
        &'a self,
        token: Address,
        payload: &'a ExactEvmPayload,
    ) -> BoxFuture<'a, Result<B256, EvmFacilitatorError>>;

    /// Waits until `hash` is mined.
    fn wait_for_receipt(
        &self,
        hash: B256,
    ) -> BoxFuture<'_, Result<TransactionOutcome, EvmFacilitatorError>>;
}

/// Tunables for [`ExactEvmFacilitator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExactEvmConfig {
    /// Minimum remaining validity, so the settlement lands before expiry.
    pub settle_buffer_secs: u64,
    /// Whether verify checks the payer's on-chain balance.
    pub check_balance: bool,
}

impl Default for ExactEvmConfig {
    fn default() -> Self {
        Self {
            settle_buffer_secs: 6,
            check_balance: true,
        }
    }
}

/// Facilitator for the EVM `exact` scheme.
#[derive(Debug)]
pub struct ExactEvmFacilitator<S> {
    signer: S,
    config: ExactEvmConfig,
}

impl<S: FacilitatorEvmSigner> ExactEvmFacilitator<S> {
    /// Creates a facilitator with default tunables.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, ExactEvmConfig::default())
    }

    /// Creates a facilitator with explicit tunables.
    pub const fn with_config(signer: S, config: ExactEvmConfig) -> Self {
        Self { signer, config }
    }

    /// Runs every check; on success returns the parsed payload and token.
    async fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<(ExactEvmPayload, Address), VerifyResponse> {
        let evm: ExactEvmPayload = serde_json::from_value(payload.payload.clone())
            .map_err(|e| VerifyResponse::invalid("invalid_payload").with_message(e.to_string()))?;
        let auth = &evm.authorization;
        let payer = auth.from.to_checksum(None);
        let reject = |reason: &str| VerifyResponse::invalid_with_payer(reason, payer.as_str());

        if payload.accepted.scheme != SCHEME_EXACT || requirements.scheme != SCHEME_EXACT {
            return Err(reject("unsupported_scheme"));
        }
        let network = chain_id(&requirements.network);
        if network.is_none() || chain_id(payload.network()) != network {
            return Err(reject("network_mismatch"));
        }
        let chain = network.unwrap_or_default();

        let token: Address = requirements
            .asset
            .parse()
            .map_err(|_| reject("invalid_payload").with_message("asset is not an address"))?;
        let pay_to: Address = requirements
            .pay_to
            .parse()
            .map_err(|_| reject("invalid_payload").with_message("payTo is not an address"))?;

        let domain = ExactEvmExtra::from_requirements(requirements).domain(chain, token);
        let hash = auth.message().eip712_signing_hash(&domain);
        let recovered = Signature::from_raw(&evm.signature)
            .ok()
            .and_then(|sig| sig.recover_address_from_prehash(&hash).ok());
        if recovered != Some(auth.from) {
            return Err(reject("invalid_exact_evm_payload_signature"));
        }

        if auth.to != pay_to {
            return Err(reject("invalid_exact_evm_payload_recipient_mismatch"));
        }
        if self.signer.addresses().contains(&auth.from) {
            return Err(reject("facilitator_self_payment"));
        }

        let now = UnixTimestamp::now();
        if auth.valid_after > now {
            return Err(reject("invalid_exact_evm_payload_authorization_valid_after"));
        }
        if auth.valid_before < now + self.config.settle_buffer_secs {
            return Err(reject("invalid_exact_evm_payload_authorization_valid_before"));
        }

        let required = U256::from_str_radix(&requirements.amount, 10)
            .map_err(|_| reject("invalid_payload").with_message("amount is not an integer"))?;
        if auth.value < required {
            return Err(reject("invalid_exact_evm_payload_authorization_value"));
        }

        let used = self
            .signer
            .authorization_state(token, auth.from, auth.nonce)
            .await
            .map_err(|e| reject("authorization_state_failed").with_message(e.to_string()))?;
        if used {
            return Err(reject("nonce_already_used"));
        }

        if self.config.check_balance {
            let balance = self
                .signer
                .balance_of(token, auth.from)
                .await
                .map_err(|e| reject("balance_check_failed").with_message(e.to_string()))?;
            if balance < auth.value {
                return Err(reject("insufficient_funds"));
            }
        }

        Ok((evm, token))
    }

    /// Verifies a payment without side effects.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, fields(network = %requirements.network))
    )]
    pub async fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        match self.check(payload, requirements).await {
            Ok((evm, _)) => VerifyResponse::valid(evm.authorization.from.to_checksum(None)),
            Err(invalid) => invalid,
        }
    }

    /// Verifies, then submits `transferWithAuthorization` and waits for it.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, fields(network = %requirements.network))
    )]
    pub async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        let network = requirements.network.as_str();
        let (evm, token) = match self.check(payload, requirements).await {
            Ok(checked) => checked,
            Err(invalid) => return SettleResponse::from_invalid(invalid, network),
        };
        let payer = evm.authorization.from.to_checksum(None);

        let hash = match self.signer.transfer_with_authorization(token, &evm).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(network, payer, error = %e, "settlement broadcast failed");
                return SettleResponse::error("broadcast_failed", network)
                    .with_payer(payer)
                    .with_message(e.to_string());
            }
        };

        match self.signer.wait_for_receipt(hash).await {
            Ok(outcome) if outcome.success => {
                SettleResponse::success(hash.to_string(), network, payer)
            }
            Ok(_) => SettleResponse::error("transaction_reverted", network)
                .with_payer(payer)
                .with_transaction(hash.to_string()),
            Err(e) => SettleResponse::error("confirmation_failed", network)
                .with_payer(payer)
                .with_transaction(hash.to_string())
                .with_message(e.to_string()),
        }
    }
}

impl<S> SchemeId for ExactEvmFacilitator<S> {
    fn namespace(&self) -> &str {
        EVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: FacilitatorEvmSigner> SchemeFacilitator for ExactEvmFacilitator<S> {
    fn get_extra(&self, _network: &str) -> Option<Value> {
        None
    }

    fn get_signers(&self, _network: &str) -> Vec<String> {
        self.signer
            .addresses()
            .iter()
            .map(|a| a.to_checksum(None))
            .collect()
    }

    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
        Box::pin(async move { Ok(self.verify_payment(payload, requirements).await) })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
        Box::pin(async move { Ok(self.settle_payment(payload, requirements).await) })
    }
}
