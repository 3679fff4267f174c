//! Client-side signing for the TON `exact` scheme.

use std::sync::Arc;

use rand::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use t402::authorization::TonAuthorization;
use t402::proto::PaymentRequirements;
use t402::scheme::{BoxFuture, SchemeClient, SchemeError, SchemeId};
use t402::timestamp::UnixTimestamp;

use super::error::{ClientError, SignError};
use super::types::{
    DEFAULT_FORWARD_TON, DEFAULT_JETTON_TRANSFER_TON, ExactTonPayload, JETTON_TRANSFER_OP,
    JettonTransferBody, MAX_JETTON_TRANSFER_TON, MIN_JETTON_TRANSFER_TON, SignMessageRequest,
};
use super::{SCHEME_EXACT, TON_NAMESPACE};
use crate::address::is_valid_address;

/// Wallet operations the TON client needs.
pub trait ClientTonSigner: Send + Sync {
    /// Wallet address in friendly form.
    fn address(&self) -> String;

    /// Current wallet sequence number.
    fn get_seqno(&self) -> BoxFuture<'_, Result<u64, SignError>>;

    /// Signs an external message carrying `request` and returns its base64
    /// BOC.
    fn sign_message(&self, request: SignMessageRequest) -> BoxFuture<'_, Result<String, SignError>>;
}

/// Resolves `(owner, jetton_master)` to the owner's Jetton wallet address.
pub type JettonWalletResolver = Arc<
    dyn Fn(String, String) -> BoxFuture<'static, Result<String, SchemeError>> + Send + Sync,
>;

/// Gas settings for [`ExactTonClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExactTonClientConfig {
    /// TON attached for gas, in nanotons. Clamped to 0.05..=0.5 TON.
    pub gas_amount: u64,
    /// TON forwarded with the transfer notification, in nanotons.
    pub forward_amount: u64,
}

impl Default for ExactTonClientConfig {
    fn default() -> Self {
        Self {
            gas_amount: DEFAULT_JETTON_TRANSFER_TON,
            forward_amount: DEFAULT_FORWARD_TON,
        }
    }
}

impl ExactTonClientConfig {
    /// The gas attachment actually used.
    #[must_use]
    pub const fn effective_gas(&self) -> u64 {
        if self.gas_amount < MIN_JETTON_TRANSFER_TON {
            MIN_JETTON_TRANSFER_TON
        } else if self.gas_amount > MAX_JETTON_TRANSFER_TON {
            MAX_JETTON_TRANSFER_TON
        } else {
            self.gas_amount
        }
    }
}

/// Client for the TON `exact` scheme.
pub struct ExactTonClient<S> {
    signer: S,
    resolver: JettonWalletResolver,
    config: ExactTonClientConfig,
}

impl<S> std::fmt::Debug for ExactTonClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactTonClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ClientTonSigner> ExactTonClient<S> {
    /// Creates a client with default gas settings.
    pub fn new(signer: S, resolver: JettonWalletResolver) -> Self {
        Self::with_config(signer, resolver, ExactTonClientConfig::default())
    }

    /// Creates a client with explicit gas settings.
    pub fn with_config(
        signer: S,
        resolver: JettonWalletResolver,
        config: ExactTonClientConfig,
    ) -> Self {
        Self {
            signer,
            resolver,
            config,
        }
    }

    /// Builds and signs a Jetton transfer for `requirements`.
    ///
    /// The seqno is read right before signing so the message targets the
    /// wallet's current state.
    ///
    /// # Errors
    ///
    /// Fails on missing or malformed fields, when the Jetton wallet cannot
    /// be resolved, or when the signer fails.
    pub async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactTonPayload, ClientError> {
        if requirements.asset.is_empty() {
            return Err(ClientError::MissingField("Asset (Jetton master address)"));
        }
        if requirements.pay_to.is_empty() {
            return Err(ClientError::MissingField("PayTo address"));
        }
        if requirements.amount.is_empty() {
            return Err(ClientError::MissingField("Amount"));
        }
        if !is_valid_address(&requirements.pay_to) {
            return Err(ClientError::InvalidAddress {
                field: "payTo",
                value: requirements.pay_to.clone(),
            });
        }
        let amount: u128 = requirements
            .amount
            .parse()
            .map_err(|_| ClientError::InvalidAmount(requirements.amount.clone()))?;

        let sender = self.signer.address();
        let jetton_wallet = (self.resolver)(sender.clone(), requirements.asset.clone())
            .await
            .map_err(|e| ClientError::JettonWallet(e.to_string()))?;
        let seqno = self.signer.get_seqno().await?;

        let timeout = requirements.max_timeout_seconds;
        let valid_until = UnixTimestamp::now() + timeout;
        let query_id: u64 = rng().random();
        let gas = self.config.effective_gas();

        let body = JettonTransferBody {
            op: JETTON_TRANSFER_OP,
            query_id,
            amount,
            destination: requirements.pay_to.clone(),
            response_destination: sender.clone(),
            forward_ton_amount: self.config.forward_amount,
        };
        let signed_boc = self
            .signer
            .sign_message(SignMessageRequest {
                to: jetton_wallet,
                value: gas,
                body,
                timeout,
                seqno,
            })
            .await?;

        tracing::debug!(network = %requirements.network, from = %sender, seqno, "signed jetton transfer");

        Ok(ExactTonPayload {
            signed_boc,
            authorization: TonAuthorization {
                from: sender,
                to: requirements.pay_to.clone(),
                jetton_master: requirements.asset.clone(),
                jetton_amount: amount.to_string(),
                ton_amount: gas.to_string(),
                valid_until: valid_until.as_secs(),
                seqno,
                query_id: query_id.to_string(),
            },
        })
    }
}

impl<S> SchemeId for ExactTonClient<S> {
    fn namespace(&self) -> &str {
        TON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: ClientTonSigner> SchemeClient for ExactTonClient<S> {
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
